//! Create-body validation: ownership stamping and insert payload assembly.

use crate::error::AppError;
use crate::request::Actor;
use crate::schema::ResourceSchema;
use crate::sql::SqlValue;
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Stamps the owner column with the actor's identity. A caller-supplied owner must match it.
    pub fn stamp_owner(
        schema: &ResourceSchema,
        record: &mut Map<String, Value>,
        actor: Option<&Actor>,
    ) -> Result<(), AppError> {
        let Some(ownership) = &schema.ownership else {
            return Ok(());
        };
        let owner = actor
            .and_then(|a| a.field(&ownership.actor_field))
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(format!("{} requires an authenticated owner", schema.name)))?;
        if let Some(given) = record.get(&ownership.column) {
            if *given != owner {
                return Err(AppError::InvalidArgument("Cannot assign different user.".into()));
            }
        }
        record.insert(ownership.column.clone(), owner);
        Ok(())
    }

    /// Builds the insert payload over owned columns in schema order. Absent fields fall back
    /// to their `initial` value or are left out; keys that are not owned columns are ignored.
    pub fn assemble_insert(
        schema: &ResourceSchema,
        record: &Map<String, Value>,
    ) -> Result<IndexMap<String, SqlValue>, AppError> {
        let mut out = IndexMap::new();
        for (field, def) in schema.owns() {
            let posted = record.get(field);
            if def.props.required && posted.is_none() {
                return Err(AppError::MissingParameter(format!("must provide {}", field)));
            }
            if def.props.read_only && posted.is_some() {
                return Err(AppError::InvalidArgument(format!("cannot set field {}", field)));
            }
            let value = match (posted, &def.initial) {
                (Some(v), _) => v.clone(),
                (None, Some(initial)) => initial.produce(),
                (None, None) => continue,
            };
            let primitive = def.ty.primitive();
            if !primitive.validate_json(&value) {
                let shown = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(AppError::invalid_value(&shown, field));
            }
            out.insert(field.clone(), primitive.to_sql_value(&value));
        }
        Ok(out)
    }
}
