//! Resource schemas: field definitions split into ownership buckets at parse time.

use crate::error::SchemaError;
use crate::sql::{ColumnRef, TableRef};
use crate::types::FieldType;
use indexmap::IndexMap;
use serde_json::Value;

/// Field property flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Props {
    /// Selected when the request names no columns.
    pub default: bool,
    /// Must be supplied on create.
    pub required: bool,
    /// Must not be supplied on create.
    pub read_only: bool,
    /// Not usable as a filter parameter.
    pub no_filter: bool,
}

impl Props {
    /// Parses property names; returns the first unknown one as the error.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut props = Props::default();
        for name in names {
            match name.as_ref() {
                "default" => props.default = true,
                "required" => props.required = true,
                "read-only" | "read_only" => props.read_only = true,
                "no-filter" => props.no_filter = true,
                other => return Err(other.to_string()),
            }
        }
        Ok(props)
    }
}

/// Value used on create when the field is not supplied.
#[derive(Clone, Debug, PartialEq)]
pub enum Initial {
    Value(Value),
    /// Current UTC time.
    Now,
}

impl Initial {
    pub fn produce(&self) -> Value {
        match self {
            Initial::Value(v) => v.clone(),
            Initial::Now => Value::String(chrono::Utc::now().to_rfc3339()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasMany,
}

impl RelationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "belongs_to" => Some(RelationKind::BelongsTo),
            "has_many" => Some(RelationKind::HasMany),
            _ => None,
        }
    }
}

/// Relation tag carried by a field before parsing.
#[derive(Clone, Debug)]
pub struct RelationSpec {
    pub kind: RelationKind,
    /// belongs_to: our column holding the related key. has_many: their column holding our key.
    pub mapping: String,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
}

/// One field as declared.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub ty: FieldType,
    pub props: Props,
    pub initial: Option<Initial>,
    pub rel: Option<RelationSpec>,
}

/// A column owned by the resource.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub ty: FieldType,
    pub props: Props,
    pub initial: Option<Initial>,
}

/// A relation field, keyed by its label in the owning schema.
#[derive(Clone, Debug)]
pub struct RelationDef {
    /// Registry name of the related resource.
    pub resource: String,
    pub props: Props,
    pub mapping: String,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SoftDelete {
    pub column: String,
    pub live: Value,
    pub deleted: Value,
}

/// Pairs a local column with the actor field whose value owns the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipMapping {
    pub column: String,
    pub actor_field: String,
}

/// Resource-level metadata plus the ordered field map.
#[derive(Clone, Debug)]
pub struct ResourceSpec {
    pub name: String,
    pub table: TableRef,
    pub path_segment: String,
    pub primary_key: Option<String>,
    pub soft_delete: Option<SoftDelete>,
    pub ownership: Option<OwnershipMapping>,
    pub upsert_noop_column: Option<String>,
    pub hidden: Vec<String>,
    pub fields: IndexMap<String, FieldSpec>,
}

/// Parsed, immutable schema of one resource.
#[derive(Clone, Debug)]
pub struct ResourceSchema {
    pub name: String,
    pub table: TableRef,
    pub path_segment: String,
    pub primary_key: Option<String>,
    pub soft_delete: Option<SoftDelete>,
    pub ownership: Option<OwnershipMapping>,
    pub upsert_noop_column: Option<String>,
    pub hidden: Vec<String>,
    types: IndexMap<String, FieldType>,
    owns: IndexMap<String, FieldDef>,
    belongs_to: IndexMap<String, RelationDef>,
    has_many: IndexMap<String, RelationDef>,
    filters: Vec<String>,
}

impl ResourceSchema {
    /// Classifies every field into exactly one bucket and derives the filterable list.
    pub fn parse(spec: ResourceSpec) -> Result<Self, SchemaError> {
        let mut types = IndexMap::new();
        let mut owns = IndexMap::new();
        let mut belongs_to = IndexMap::new();
        let mut has_many = IndexMap::new();
        let mut filters = Vec::new();

        for (label, field) in spec.fields {
            types.insert(label.clone(), field.ty.clone());
            if !field.props.no_filter {
                filters.push(label.clone());
            }
            let Some(rel) = field.rel else {
                owns.insert(
                    label,
                    FieldDef {
                        ty: field.ty,
                        props: field.props,
                        initial: field.initial,
                    },
                );
                continue;
            };
            let resource = field
                .ty
                .resource_name()
                .ok_or_else(|| SchemaError::InvalidRelation {
                    resource: spec.name.clone(),
                    field: label.clone(),
                    reason: "relation fields must reference a resource type".into(),
                })?
                .to_string();
            let def = RelationDef {
                resource,
                props: field.props,
                mapping: rel.mapping,
                limit: rel.limit,
                sort_by: rel.sort_by,
            };
            match rel.kind {
                RelationKind::BelongsTo => belongs_to.insert(label, def),
                RelationKind::HasMany => has_many.insert(label, def),
            };
        }

        let require_owned = |column: &str| -> Result<(), SchemaError> {
            if owns.contains_key(column) {
                Ok(())
            } else {
                Err(SchemaError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", spec.name, column),
                })
            }
        };
        if let Some(pk) = &spec.primary_key {
            if !owns.contains_key(pk) {
                return Err(SchemaError::InvalidPrimaryKey {
                    resource: spec.name.clone(),
                    field: pk.clone(),
                });
            }
        }
        if let Some(ownership) = &spec.ownership {
            require_owned(&ownership.column)?;
        }
        if let Some(col) = &spec.upsert_noop_column {
            require_owned(col)?;
        }
        for rel in belongs_to.values() {
            require_owned(&rel.mapping)?;
        }
        // result aliases are `<table>_<column>` and `<label>_<column>`; a label must not capture root aliases
        let root_prefix = format!("{}_", spec.table.name);
        for label in belongs_to.keys().chain(has_many.keys()) {
            if *label == spec.table.name || label.starts_with(&root_prefix) {
                return Err(SchemaError::InvalidRelation {
                    resource: spec.name.clone(),
                    field: label.clone(),
                    reason: format!("label clashes with the column prefix of table '{}'", spec.table.name),
                });
            }
        }

        Ok(ResourceSchema {
            name: spec.name,
            table: spec.table,
            path_segment: spec.path_segment,
            primary_key: spec.primary_key,
            soft_delete: spec.soft_delete,
            ownership: spec.ownership,
            upsert_noop_column: spec.upsert_noop_column,
            hidden: spec.hidden,
            types,
            owns,
            belongs_to,
            has_many,
            filters,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    /// `<table>.<column>` on this resource's own table.
    pub fn column(&self, name: &str) -> ColumnRef {
        ColumnRef::new(self.table.name.clone(), name)
    }

    pub fn field_type(&self, name: &str) -> Option<&FieldType> {
        self.types.get(name)
    }

    pub fn owns(&self) -> &IndexMap<String, FieldDef> {
        &self.owns
    }

    pub fn belongs_to(&self) -> &IndexMap<String, RelationDef> {
        &self.belongs_to
    }

    pub fn has_many(&self) -> &IndexMap<String, RelationDef> {
        &self.has_many
    }

    /// Filterable field names in declaration order.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn relations(&self) -> impl Iterator<Item = (&String, &RelationDef)> {
        self.belongs_to.iter().chain(self.has_many.iter())
    }
}
