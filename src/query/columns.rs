//! Column projection: `verbose`, default columns, or `fields=name[,label.name]`.

use crate::config::Registry;
use crate::error::AppError;
use crate::query::join_table;
use crate::request::QueryParams;
use crate::schema::ResourceSchema;
use crate::sql::{ColumnRef, QueryContext};

/// Which columns a request selects. Exactly one strategy applies per request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Every owned column of the root and of each `belongs_to` relation.
    Verbose,
    /// Columns flagged `default`, on the root and on relations flagged `default`.
    Default,
    /// Entries from `fields`; `label.col` targets a relation, `label.` its default columns.
    Requested(Vec<String>),
}

impl Selection {
    pub fn from_params(params: &QueryParams) -> Self {
        if params.contains("verbose") {
            return Selection::Verbose;
        }
        match params.get("fields") {
            None => Selection::Default,
            Some(fields) => Selection::Requested(fields.split(',').map(str::to_string).collect()),
        }
    }

    /// Adds the chosen columns of `resource`, qualified by `label` or the resource's table.
    /// Returns whether any column was added.
    fn choose(&self, resource: &ResourceSchema, label: Option<&str>, query: &mut QueryContext) -> bool {
        match self {
            Selection::Verbose => {
                for name in resource.owns().keys() {
                    add_column(resource, label, name, query);
                }
                true
            }
            Selection::Default => default_columns(resource, label, query),
            Selection::Requested(requested) => {
                let mut used = false;
                for entry in requested {
                    let name = match label {
                        Some(label) => match entry.strip_prefix(label).and_then(|rest| rest.strip_prefix('.')) {
                            Some(rest) => rest,
                            None => continue,
                        },
                        None => entry.as_str(),
                    };
                    if resource.owns().contains_key(name) {
                        add_column(resource, label, name, query);
                        used = true;
                    } else if name.is_empty() {
                        used |= default_columns(resource, label, query);
                    }
                }
                used
            }
        }
    }
}

fn add_column(resource: &ResourceSchema, label: Option<&str>, name: &str, query: &mut QueryContext) {
    let qualifier = label.unwrap_or(resource.table_name());
    query.add_column(ColumnRef::new(qualifier, name));
}

fn default_columns(resource: &ResourceSchema, label: Option<&str>, query: &mut QueryContext) -> bool {
    let mut used = false;
    for (name, def) in resource.owns() {
        if def.props.default {
            add_column(resource, label, name, query);
            used = true;
        }
    }
    used
}

/// Projects the root resource, then each `belongs_to` relation one level deep. A relation
/// is joined only when it contributed at least one column.
pub fn apply_columns(
    registry: &Registry,
    schema: &ResourceSchema,
    selection: &Selection,
    query: &mut QueryContext,
) -> Result<(), AppError> {
    selection.choose(schema, None, query);

    for (label, rel) in schema.belongs_to() {
        if *selection == Selection::Default && !rel.props.default {
            continue;
        }
        let related = registry.related(rel)?;
        if selection.choose(related, Some(label), query) {
            join_table(query, schema, label, related)?;
        }
    }
    Ok(())
}
