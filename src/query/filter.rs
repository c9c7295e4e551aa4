//! Filter DSL: `field=value` for owned columns, `relation=key=value[,key=value]` one relation deep.

use crate::config::Registry;
use crate::error::AppError;
use crate::query::join_table;
use crate::schema::ResourceSchema;
use crate::sql::{ColumnRef, QueryContext};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static QUOTED: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r#"['|"]([^'"]*)['|"]"#));

/// Applies every filterable field present in `requests`, in schema order. `label` is set
/// when filtering a related resource through its relation label.
pub fn apply_filters(
    registry: &Registry,
    schema: &ResourceSchema,
    requests: &IndexMap<String, String>,
    query: &mut QueryContext,
    label: Option<&str>,
) -> Result<(), AppError> {
    for name in schema.filters() {
        let Some(value) = requests.get(name) else {
            continue;
        };

        if let Some(def) = schema.owns().get(name) {
            let qualifier = label.unwrap_or(schema.table_name());
            def.ty
                .primitive()
                .apply_filter(ColumnRef::new(qualifier, name.as_str()), query, value)?;
            continue;
        }

        if label.is_some() {
            return Err(AppError::InvalidArgument("filters may only be nested to 1 level".into()));
        }
        let rel = schema.belongs_to().get(name).ok_or_else(|| {
            AppError::InvalidArgument(format!("filter '{}' must name a belongs_to relation", name))
        })?;
        let related = registry.related(rel)?;
        let subrequests = parse_subrequests(value)?;
        apply_filters(registry, related, &subrequests, query, Some(name))?;
        join_table(query, schema, name, related)?;
    }
    Ok(())
}

/// `key=value[,key=value]` with the first quoted run unquoted. Values may contain `=`.
fn parse_subrequests(value: &str) -> Result<IndexMap<String, String>, AppError> {
    let re = QUOTED
        .as_ref()
        .map_err(|e| AppError::InvalidArgument(format!("filter pattern: {}", e)))?;
    let value = re.replace(value, "$1");
    Ok(value
        .split(',')
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (kv.to_string(), String::new()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::QueryParams;
    use crate::sql::{CompareOp, Condition, SqlValue};
    use crate::testing::fixture_registry;

    fn filter(resource: &str, params: &str) -> Result<QueryContext, AppError> {
        let registry = fixture_registry();
        let schema = registry.get(resource).unwrap();
        let mut query = QueryContext::new(schema.table.clone());
        apply_filters(&registry, schema, QueryParams::parse(params).as_map(), &mut query, None)?;
        Ok(query)
    }

    #[test]
    fn owned_fields_filter_in_schema_order() {
        let query = filter("entries", "creator_id=4&name=~camp&unrelated=1").unwrap();
        assert_eq!(
            query.conditions(),
            &[
                Condition::Compare {
                    column: ColumnRef::new("idea", "name"),
                    op: CompareOp::Like,
                    value: SqlValue::String("%camp%".into()),
                },
                Condition::eq(ColumnRef::new("idea", "creator_id"), SqlValue::I64(4)),
            ]
        );
    }

    #[test]
    fn relation_filter_descends_and_joins() {
        let query = filter("entries", "creator=username='bob',id=>2").unwrap();
        assert!(query.is_joined("creator"));
        assert_eq!(
            query.conditions(),
            &[
                Condition::Compare {
                    column: ColumnRef::new("creator", "id"),
                    op: CompareOp::Gt,
                    value: SqlValue::I64(2),
                },
                Condition::Compare {
                    column: ColumnRef::new("creator", "username"),
                    op: CompareOp::Like,
                    value: SqlValue::String("bob".into()),
                },
            ]
        );
    }

    #[test]
    fn no_filter_fields_are_ignored() {
        let query = filter("users", "entries=name=x&password=secret").unwrap();
        assert!(query.conditions().is_empty());
        assert!(query.joins().is_empty());
    }

    #[test]
    fn relation_of_a_relation_is_rejected() {
        let err = filter("entries", "list=creator=5").unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: filters may only be nested to 1 level");
    }

    #[test]
    fn invalid_nested_value_fails() {
        let err = filter("entries", "creator=id=abc").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn subrequests_keep_equals_in_values() {
        let parsed = parse_subrequests("\"name=a=b\",id=3").unwrap();
        assert_eq!(parsed["name"], "a=b");
        assert_eq!(parsed["id"], "3");
    }
}
