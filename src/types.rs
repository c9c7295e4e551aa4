//! Field value kinds: validation, filter-clause generation and insert coercion.
//!
//! A filter operand may start with a prefix operator (`>=`, `~`, `!`, ...). Each kind
//! declares its prefix table as an ordered slice and the first matching prefix wins,
//! so longer tokens sharing a leading character (`>=` before `>`, `!~` before `!`)
//! must be listed first. A comma-separated operand is a list: every part must
//! validate, and one clause per part is OR-ed using the operator resolved once
//! from the whole operand.

use crate::error::AppError;
use crate::sql::{ColumnRef, CompareOp, Condition, QueryContext, SqlValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Comparison applied by a filter, plus whether the operand becomes a `%…%` pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterOp {
    pub compare: CompareOp,
    pub contains: bool,
}

impl FilterOp {
    const fn cmp(compare: CompareOp) -> Self {
        FilterOp {
            compare,
            contains: false,
        }
    }

    const fn contains(compare: CompareOp) -> Self {
        FilterOp {
            compare,
            contains: true,
        }
    }
}

const INTEGER_PREFIXES: &[(&str, FilterOp)] = &[
    (">=", FilterOp::cmp(CompareOp::Ge)),
    ("<=", FilterOp::cmp(CompareOp::Le)),
    ("<", FilterOp::cmp(CompareOp::Lt)),
    (">", FilterOp::cmp(CompareOp::Gt)),
];

const STRING_PREFIXES: &[(&str, FilterOp)] = &[
    ("!~", FilterOp::contains(CompareOp::NotLike)),
    ("~", FilterOp::contains(CompareOp::Like)),
    ("!", FilterOp::cmp(CompareOp::Ne)),
];

const TIMESTAMP_PREFIXES: &[(&str, FilterOp)] = &[
    ("<=", FilterOp::cmp(CompareOp::Le)),
    (">=", FilterOp::cmp(CompareOp::Ge)),
    ("<", FilterOp::cmp(CompareOp::Lt)),
    (">", FilterOp::cmp(CompareOp::Gt)),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Primitive {
    Integer,
    Boolean,
    String,
    Timestamp,
    /// A string restricted to the listed values.
    Enum(Vec<String>),
}

/// A field's kind: a primitive, or a reference to another resource by registry name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Primitive(Primitive),
    Resource(String),
}

/// Resource references are keyed by integer ids.
static RESOURCE_KEY: Primitive = Primitive::Integer;

impl FieldType {
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            FieldType::Resource(name) => Some(name),
            FieldType::Primitive(_) => None,
        }
    }

    /// The primitive that validates and filters values of this field.
    pub fn primitive(&self) -> &Primitive {
        match self {
            FieldType::Primitive(p) => p,
            FieldType::Resource(_) => &RESOURCE_KEY,
        }
    }
}

/// Parses the date/time formats accepted by timestamp fields.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_number(s: &str) -> Option<SqlValue> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(SqlValue::I64(i));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(SqlValue::F64)
}

fn parse_bool(s: &str) -> Option<bool> {
    if s == "1" || s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s == "0" || s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl Primitive {
    pub fn prefix_operators(&self) -> &'static [(&'static str, FilterOp)] {
        match self {
            Primitive::Integer => INTEGER_PREFIXES,
            Primitive::String => STRING_PREFIXES,
            Primitive::Timestamp => TIMESTAMP_PREFIXES,
            Primitive::Boolean | Primitive::Enum(_) => &[],
        }
    }

    pub fn default_operator(&self) -> FilterOp {
        match self {
            Primitive::String => FilterOp::cmp(CompareOp::Like),
            _ => FilterOp::cmp(CompareOp::Eq),
        }
    }

    fn validate_one(&self, s: &str) -> bool {
        match self {
            Primitive::Integer => parse_number(s).is_some(),
            Primitive::Boolean => parse_bool(s).is_some(),
            Primitive::String => !s.is_empty(),
            Primitive::Timestamp => parse_timestamp(s).is_some(),
            Primitive::Enum(values) => values.iter().any(|v| v == s),
        }
    }

    /// Validates a raw request value; a comma-separated list validates only if every part does.
    pub fn validate(&self, raw: &str) -> bool {
        raw.split(',').all(|part| self.validate_one(part))
    }

    /// Validates a JSON value supplied for insertion. Null is always accepted.
    pub fn validate_json(&self, v: &Value) -> bool {
        match (self, v) {
            (_, Value::Null) => true,
            (Primitive::Integer, Value::Number(_)) => true,
            (Primitive::Boolean, Value::Bool(_)) => true,
            (Primitive::Boolean, Value::Number(n)) => matches!(n.as_i64(), Some(0 | 1)),
            (Primitive::String, Value::Number(_) | Value::Bool(_)) => true,
            (_, Value::String(s)) => self.validate_one(s),
            _ => false,
        }
    }

    /// Coerces a validated JSON value into its bind value.
    pub fn to_sql_value(&self, v: &Value) -> SqlValue {
        match (self, v) {
            (_, Value::Null) => SqlValue::Null,
            (Primitive::Integer, Value::String(s)) => parse_number(s).unwrap_or(SqlValue::Null),
            (Primitive::Boolean, Value::Number(n)) => SqlValue::Bool(n.as_i64() != Some(0)),
            (Primitive::Boolean, Value::String(s)) => SqlValue::Bool(parse_bool(s).unwrap_or(false)),
            (Primitive::String, Value::Number(n)) => SqlValue::String(n.to_string()),
            (Primitive::String, Value::Bool(b)) => SqlValue::String(b.to_string()),
            (Primitive::Timestamp, Value::String(s)) => {
                parse_timestamp(s).map(SqlValue::Timestamp).unwrap_or(SqlValue::Null)
            }
            _ => SqlValue::from_json(v),
        }
    }

    fn operand(&self, s: &str, op: FilterOp) -> SqlValue {
        match self {
            Primitive::Integer => parse_number(s).unwrap_or(SqlValue::Null),
            Primitive::Boolean => SqlValue::Bool(parse_bool(s).unwrap_or(false)),
            Primitive::Timestamp => parse_timestamp(s).map(SqlValue::Timestamp).unwrap_or(SqlValue::Null),
            Primitive::String if op.contains => SqlValue::String(format!("%{}%", s)),
            Primitive::String | Primitive::Enum(_) => SqlValue::String(s.to_string()),
        }
    }

    /// Adds the filter clause for `value` on `column`. On an invalid operand the query is left untouched.
    pub fn apply_filter(&self, column: ColumnRef, query: &mut QueryContext, value: &str) -> Result<(), AppError> {
        let (op, raw) = self
            .prefix_operators()
            .iter()
            .find(|(prefix, _)| value.starts_with(prefix))
            .map(|(prefix, op)| (*op, &value[prefix.len()..]))
            .unwrap_or((self.default_operator(), value));

        if !self.validate(raw) {
            return Err(AppError::invalid_value(raw, &column.to_string()));
        }

        let mut clauses: Vec<Condition> = raw
            .split(',')
            .map(|part| Condition::Compare {
                column: column.clone(),
                op: op.compare,
                value: self.operand(part, op),
            })
            .collect();
        let condition = if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Condition::AnyOf(clauses)
        };
        query.push_condition(condition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::TableRef;
    use serde_json::json;

    fn ctx() -> QueryContext {
        QueryContext::new(TableRef::named("idea"))
    }

    fn col() -> ColumnRef {
        ColumnRef::new("idea", "size")
    }

    #[test]
    fn integer_prefixes_resolve_longest_first() {
        let mut q = ctx();
        Primitive::Integer.apply_filter(col(), &mut q, ">=10").unwrap();
        assert_eq!(
            q.conditions(),
            &[Condition::Compare {
                column: col(),
                op: CompareOp::Ge,
                value: SqlValue::I64(10)
            }]
        );

        let mut q = ctx();
        Primitive::Integer.apply_filter(col(), &mut q, ">10").unwrap();
        assert!(matches!(&q.conditions()[0], Condition::Compare { op: CompareOp::Gt, .. }));
    }

    #[test]
    fn list_values_or_one_clause_per_value_with_one_operator() {
        let mut q = ctx();
        Primitive::Integer.apply_filter(col(), &mut q, "<5,7,9").unwrap();
        let Condition::AnyOf(parts) = &q.conditions()[0] else {
            panic!("expected OR group");
        };
        assert_eq!(parts.len(), 3);
        for (part, expected) in parts.iter().zip([5, 7, 9]) {
            assert_eq!(
                part,
                &Condition::Compare {
                    column: col(),
                    op: CompareOp::Lt,
                    value: SqlValue::I64(expected)
                }
            );
        }
    }

    #[test]
    fn invalid_operand_fails_without_touching_query() {
        let mut q = ctx();
        let err = Primitive::Integer.apply_filter(col(), &mut q, "5,x").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(q.conditions().is_empty());

        let err = Primitive::String
            .apply_filter(ColumnRef::new("idea", "name"), &mut q, "!")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(q.conditions().is_empty());
    }

    #[test]
    fn string_operators() {
        let name = ColumnRef::new("idea", "name");
        let cases = [
            ("bob", CompareOp::Like, "bob"),
            ("~bob", CompareOp::Like, "%bob%"),
            ("!~bob", CompareOp::NotLike, "%bob%"),
            ("!bob", CompareOp::Ne, "bob"),
        ];
        for (input, op, operand) in cases {
            let mut q = ctx();
            Primitive::String.apply_filter(name.clone(), &mut q, input).unwrap();
            assert_eq!(
                q.conditions()[0],
                Condition::Compare {
                    column: name.clone(),
                    op,
                    value: SqlValue::String(operand.into())
                },
                "input {}",
                input
            );
        }
    }

    #[test]
    fn boolean_coerces_and_has_no_prefixes() {
        assert!(Primitive::Boolean.validate("TRUE"));
        assert!(Primitive::Boolean.validate("0"));
        assert!(!Primitive::Boolean.validate("yes"));
        let mut q = ctx();
        Primitive::Boolean
            .apply_filter(ColumnRef::new("idea", "isPrivate"), &mut q, "1")
            .unwrap();
        assert!(matches!(
            &q.conditions()[0],
            Condition::Compare { op: CompareOp::Eq, value: SqlValue::Bool(true), .. }
        ));
    }

    #[test]
    fn timestamp_operands_are_parsed() {
        let mut q = ctx();
        Primitive::Timestamp
            .apply_filter(ColumnRef::new("idea", "createdAt"), &mut q, "<=2024-03-01")
            .unwrap();
        let expected = parse_timestamp("2024-03-01T00:00:00").unwrap();
        assert!(matches!(
            &q.conditions()[0],
            Condition::Compare { op: CompareOp::Le, value: SqlValue::Timestamp(t), .. } if *t == expected
        ));
        assert!(!Primitive::Timestamp.validate("not a date"));
        assert!(Primitive::Timestamp.validate("2024-03-01T10:00:00Z"));
    }

    #[test]
    fn enum_accepts_declared_values_only() {
        let category = Primitive::Enum(vec!["topic".into(), "location".into()]);
        assert!(category.validate("topic"));
        assert!(category.validate("topic,location"));
        assert!(!category.validate("other"));
        assert!(category.prefix_operators().is_empty());
    }

    #[test]
    fn json_validation_for_inserts() {
        assert!(Primitive::Integer.validate_json(&json!(4)));
        assert!(Primitive::Integer.validate_json(&json!("4")));
        assert!(!Primitive::Integer.validate_json(&json!("four")));
        assert!(!Primitive::String.validate_json(&json!("")));
        assert!(Primitive::Boolean.validate_json(&json!(1)));
        assert!(!Primitive::Boolean.validate_json(&json!(2)));
        assert!(Primitive::Timestamp.validate_json(&Value::Null));
        assert_eq!(Primitive::Boolean.to_sql_value(&json!("false")), SqlValue::Bool(false));
        assert_eq!(Primitive::Integer.to_sql_value(&json!("12")), SqlValue::I64(12));
    }

    #[test]
    fn resource_references_behave_as_integers() {
        let ty = FieldType::Resource("users".into());
        assert_eq!(ty.primitive(), &Primitive::Integer);
        assert_eq!(ty.resource_name(), Some("users"));
    }
}
