//! Load resource config from JSON and resolve it into a registry.

use crate::config::types::*;
use crate::config::{validate_references, Registry};
use crate::error::SchemaError;
use crate::schema::{
    FieldSpec, Initial, OwnershipMapping, Props, RelationKind, RelationSpec, ResourceSchema, ResourceSpec, SoftDelete,
};
use crate::sql::TableRef;
use crate::types::{FieldType, Primitive};
use std::path::Path;

/// Build the registry from resource configs: parse each schema, then check cross-resource references.
pub fn resolve(configs: &[ResourceConfig]) -> Result<Registry, SchemaError> {
    let mut schemas = Vec::with_capacity(configs.len());
    for cfg in configs {
        schemas.push(ResourceSchema::parse(resource_spec(cfg)?)?);
    }
    let registry = Registry::from_schemas(schemas)?;
    validate_references(&registry)?;
    tracing::info!(resources = configs.len(), "resource registry resolved");
    Ok(registry)
}

fn resource_spec(cfg: &ResourceConfig) -> Result<ResourceSpec, SchemaError> {
    let mut fields = indexmap::IndexMap::with_capacity(cfg.fields.len());
    for (label, field) in &cfg.fields {
        fields.insert(label.clone(), field_spec(&cfg.name, label, field)?);
    }
    let soft_delete = cfg.soft_delete.as_ref().map(|sd| match sd {
        SoftDeleteConfig::Column(column) => SoftDelete {
            column: column.clone(),
            live: default_live(),
            deleted: default_deleted(),
        },
        SoftDeleteConfig::Spec { column, live, deleted } => SoftDelete {
            column: column.clone(),
            live: live.clone(),
            deleted: deleted.clone(),
        },
    });
    Ok(ResourceSpec {
        name: cfg.name.clone(),
        table: TableRef {
            name: cfg.table.clone(),
            source: cfg.source.clone(),
        },
        path_segment: cfg.path_segment.clone().unwrap_or_else(|| cfg.name.clone()),
        primary_key: cfg.primary_key.clone(),
        soft_delete,
        ownership: cfg.ownership.as_ref().map(|o| OwnershipMapping {
            column: o.column.clone(),
            actor_field: o.actor_field.clone(),
        }),
        upsert_noop_column: cfg.upsert_noop_column.clone(),
        hidden: cfg.hidden.clone(),
        fields,
    })
}

fn field_spec(resource: &str, label: &str, cfg: &FieldConfig) -> Result<FieldSpec, SchemaError> {
    let unknown_type = |type_name: &str| SchemaError::UnknownType {
        resource: resource.to_string(),
        field: label.to_string(),
        type_name: type_name.to_string(),
    };
    let ty = match &cfg.type_ {
        FieldTypeConfig::Simple(name) => FieldType::Primitive(match name.to_lowercase().as_str() {
            "int" | "integer" => Primitive::Integer,
            "bool" | "boolean" => Primitive::Boolean,
            "str" | "string" => Primitive::String,
            "date" | "timestamp" => Primitive::Timestamp,
            _ => return Err(unknown_type(name)),
        }),
        FieldTypeConfig::Enum { one_of } => FieldType::Primitive(Primitive::Enum(one_of.clone())),
        FieldTypeConfig::Resource { resource } => FieldType::Resource(resource.clone()),
    };

    let props = Props::parse(&cfg.props).map_err(|prop| SchemaError::UnknownProperty {
        resource: resource.to_string(),
        field: label.to_string(),
        prop,
    })?;

    let initial = match &cfg.initial {
        None => None,
        Some(InitialConfig::Literal(v)) => Some(Initial::Value(v.clone())),
        Some(InitialConfig::Generator { generator }) if generator == "now" => Some(Initial::Now),
        Some(InitialConfig::Generator { generator }) => return Err(unknown_type(&format!("generator {}", generator))),
    };

    let invalid_relation = |reason: String| SchemaError::InvalidRelation {
        resource: resource.to_string(),
        field: label.to_string(),
        reason,
    };
    let rel = match &cfg.rel {
        None => None,
        Some(kind) => {
            let kind = RelationKind::parse(kind)
                .ok_or_else(|| invalid_relation(format!("unknown relation kind '{}'", kind)))?;
            let mapping = cfg
                .mapping
                .clone()
                .ok_or_else(|| invalid_relation("relation requires a mapping".into()))?;
            Some(RelationSpec {
                kind,
                mapping,
                limit: cfg.limit,
                sort_by: cfg.sort_by.clone(),
            })
        }
    };

    Ok(FieldSpec { ty, props, initial, rel })
}

/// Load resource configs from a JSON file (an array of resources) or a directory of `*.json` files.
pub async fn load_from_path(path: &Path) -> Result<Vec<ResourceConfig>, SchemaError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))?;
    if !meta.is_dir() {
        return load_file(path).await;
    }

    let mut files = Vec::new();
    let mut dir = tokio::fs::read_dir(path)
        .await
        .map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))?;
    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| SchemaError::Load(e.to_string()))?
    {
        let p = entry.path();
        if p.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(p);
        }
    }
    files.sort();

    let mut out = Vec::new();
    for file in files {
        out.extend(load_file(&file).await?);
    }
    Ok(out)
}

async fn load_file(path: &Path) -> Result<Vec<ResourceConfig>, SchemaError> {
    tracing::debug!(path = %path.display(), "loading resource config");
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))?;
    let parsed = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        other => serde_json::from_value(other).map(|one| vec![one]),
    };
    parsed.map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))
}
