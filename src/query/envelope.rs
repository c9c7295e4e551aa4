//! Rebuilds nested response objects from flat `<prefix>_<column>` rows.

use crate::config::Registry;
use crate::schema::ResourceSchema;
use crate::store::Row;
use serde_json::{Map, Value};

/// Splits each key on the longest known prefix followed by `_`. Known prefixes are the
/// root table name and every relation label. Root columns are hoisted to the top level,
/// relation columns nest under their label, and unmatched keys pass through.
pub fn apply_envelopes(schema: &ResourceSchema, row: Row) -> Map<String, Value> {
    let root = schema.table_name();
    let prefixes: Vec<&str> = std::iter::once(root)
        .chain(schema.relations().map(|(label, _)| label.as_str()))
        .collect();

    let mut out = Map::new();
    for (key, value) in row {
        let matched = prefixes
            .iter()
            .filter(|p| key.len() > p.len() && key.starts_with(**p) && key.as_bytes()[p.len()] == b'_')
            .max_by_key(|p| p.len());
        let Some(prefix) = matched else {
            out.insert(key, value);
            continue;
        };
        let column = key[prefix.len() + 1..].to_string();
        if *prefix == root {
            out.insert(column, value);
            continue;
        }
        let envelope = out
            .entry(prefix.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(nested) = envelope {
            nested.insert(column, value);
        }
    }
    out
}

/// Removes hidden fields of the root resource and of each nested relation envelope.
pub fn strip_hidden(registry: &Registry, schema: &ResourceSchema, envelope: &mut Map<String, Value>) {
    for field in &schema.hidden {
        envelope.remove(field);
    }
    for (label, rel) in schema.relations() {
        let (Some(related), Some(Value::Object(nested))) = (registry.get(&rel.resource), envelope.get_mut(label))
        else {
            continue;
        };
        for field in &related.hidden {
            nested.remove(field);
        }
    }
}
