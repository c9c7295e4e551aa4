//! Cross-resource validation: relation targets, join keys and type references.

use crate::config::Registry;
use crate::error::SchemaError;

pub fn validate_references(registry: &Registry) -> Result<(), SchemaError> {
    for schema in registry.resources() {
        for (label, rel) in schema.belongs_to() {
            let target = registry.get(&rel.resource).ok_or_else(|| SchemaError::MissingReference {
                kind: "resource",
                id: rel.resource.clone(),
            })?;
            if target.primary_key.is_none() {
                return Err(SchemaError::InvalidRelation {
                    resource: schema.name.clone(),
                    field: label.clone(),
                    reason: format!("related resource '{}' has no primary key", target.name),
                });
            }
        }
        for (label, rel) in schema.has_many() {
            let target = registry.get(&rel.resource).ok_or_else(|| SchemaError::MissingReference {
                kind: "resource",
                id: rel.resource.clone(),
            })?;
            if !target.owns().contains_key(&rel.mapping) {
                return Err(SchemaError::InvalidRelation {
                    resource: schema.name.clone(),
                    field: label.clone(),
                    reason: format!("'{}' is not a column of '{}'", rel.mapping, target.name),
                });
            }
        }
        for (field, def) in schema.owns() {
            if let Some(name) = def.ty.resource_name() {
                if registry.get(name).is_none() {
                    return Err(SchemaError::MissingReference {
                        kind: "resource",
                        id: format!("{} (field {}.{})", name, schema.name, field),
                    });
                }
            }
        }
    }
    Ok(())
}
