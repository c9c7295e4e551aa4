//! Sort DSL: `sort_by=[-]field[,[-]label.field]`. A leading `-` sorts ascending; a bare field sorts descending.

use crate::config::Registry;
use crate::error::AppError;
use crate::query::join_table;
use crate::request::QueryParams;
use crate::schema::ResourceSchema;
use crate::sql::{ColumnRef, QueryContext, SortDirection};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortTerm {
    pub field: String,
    pub direction: SortDirection,
}

pub fn parse_sort(raw: &str) -> Vec<SortTerm> {
    raw.split(',')
        .map(|term| match term.strip_prefix('-') {
            Some(field) => SortTerm {
                field: field.to_string(),
                direction: SortDirection::Asc,
            },
            None => SortTerm {
                field: term.to_string(),
                direction: SortDirection::Desc,
            },
        })
        .collect()
}

/// Orders by owned columns or `label.subfield` of a `belongs_to` relation, joining it.
/// In quiet mode unrecognized fields are skipped instead of failing.
pub fn apply_sorting(
    registry: &Registry,
    schema: &ResourceSchema,
    params: &QueryParams,
    query: &mut QueryContext,
    quiet: bool,
) -> Result<(), AppError> {
    let Some(raw) = params.get("sort_by") else {
        return Ok(());
    };

    for term in parse_sort(raw) {
        if schema.owns().contains_key(&term.field) {
            query.order_by(schema.column(&term.field), term.direction);
            continue;
        }

        match resolve_subfield(registry, schema, &term.field)? {
            Some((label, subfield, related)) => {
                query.order_by(ColumnRef::new(label, subfield), term.direction);
                join_table(query, schema, label, related)?;
            }
            None if quiet => {}
            None => {
                return Err(AppError::InvalidArgument(format!(
                    "sort_by field '{}' not recognized",
                    term.field
                )))
            }
        }
    }
    Ok(())
}

fn resolve_subfield<'a>(
    registry: &'a Registry,
    schema: &ResourceSchema,
    field: &'a str,
) -> Result<Option<(&'a str, &'a str, &'a ResourceSchema)>, AppError> {
    let mut parts = field.split('.');
    let (Some(label), Some(subfield), None) = (parts.next(), parts.next(), parts.next()) else {
        return Ok(None);
    };
    let Some(rel) = schema.belongs_to().get(label) else {
        return Ok(None);
    };
    let related = registry.related(rel)?;
    if !related.owns().contains_key(subfield) {
        return Ok(None);
    }
    Ok(Some((label, subfield, related)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_registry;

    fn sort(params: &str, quiet: bool) -> Result<QueryContext, AppError> {
        let registry = fixture_registry();
        let schema = registry.get("entries").unwrap();
        let mut query = QueryContext::new(schema.table.clone());
        apply_sorting(&registry, schema, &QueryParams::parse(params), &mut query, quiet)?;
        Ok(query)
    }

    #[test]
    fn dash_sorts_ascending_and_bare_field_descending() {
        let query = sort("sort_by=-name,created_at", false).unwrap();
        assert_eq!(
            query.ordering(),
            &[
                (ColumnRef::new("idea", "name"), SortDirection::Asc),
                (ColumnRef::new("idea", "created_at"), SortDirection::Desc),
            ]
        );
    }

    #[test]
    fn relation_subfield_joins_and_orders() {
        let query = sort("sort_by=creator.username", false).unwrap();
        assert_eq!(
            query.ordering(),
            &[(ColumnRef::new("creator", "username"), SortDirection::Desc)]
        );
        assert!(query.is_joined("creator"));
    }

    #[test]
    fn unknown_fields_fail_unless_quiet() {
        let err = sort("sort_by=bogus", false).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: sort_by field 'bogus' not recognized");
        assert!(sort("sort_by=creator.username.x", false).is_err());
        assert!(sort("sort_by=creator.password_hash", false).is_err());

        let query = sort("sort_by=bogus,-creator.nope,-name", true).unwrap();
        assert_eq!(query.ordering(), &[(ColumnRef::new("idea", "name"), SortDirection::Asc)]);
        assert!(query.joins().is_empty());
    }

    #[test]
    fn absent_sort_by_is_a_no_op() {
        assert!(sort("limit=2", false).unwrap().ordering().is_empty());
    }
}
