//! Typed bind values and their conversion to PostgreSQL parameters.

use chrono::NaiveDateTime;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value bound to a statement parameter. `Null` is rendered inline by the builder and never bound.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Timestamp(NaiveDateTime),
    Json(Value),
}

impl SqlValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::I64(i)
                } else {
                    SqlValue::F64(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => SqlValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Json(v.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl<'q> Encode<'q, Postgres> for SqlValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            SqlValue::Null => IsNull::Yes,
            SqlValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            SqlValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            SqlValue::Timestamp(t) => <NaiveDateTime as Encode<Postgres>>::encode_by_ref(t, buf)?,
            SqlValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            SqlValue::Null | SqlValue::String(_) => <String as sqlx::Type<Postgres>>::type_info(),
            SqlValue::Bool(_) => <bool as sqlx::Type<Postgres>>::type_info(),
            SqlValue::I64(_) => <i64 as sqlx::Type<Postgres>>::type_info(),
            SqlValue::F64(_) => <f64 as sqlx::Type<Postgres>>::type_info(),
            SqlValue::Timestamp(_) => <NaiveDateTime as sqlx::Type<Postgres>>::type_info(),
            SqlValue::Json(_) => <Value as sqlx::Type<Postgres>>::type_info(),
        })
    }
}

impl sqlx::Type<Postgres> for SqlValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_prefer_integers() {
        assert_eq!(SqlValue::from_json(&json!(5)), SqlValue::I64(5));
        assert_eq!(SqlValue::from_json(&json!(2.5)), SqlValue::F64(2.5));
        assert_eq!(SqlValue::from_json(&json!("x")), SqlValue::String("x".into()));
        assert!(SqlValue::from_json(&Value::Null).is_null());
    }
}
