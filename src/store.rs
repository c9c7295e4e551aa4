//! Statement execution: the `Store` seam and its PostgreSQL implementation.

use crate::error::StoreError;
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPool, PgRow, PgTypeKind};
use sqlx::query::Query;
use sqlx::Postgres;

/// One result row keyed by column alias.
pub type Row = Map<String, Value>;

/// Executes rendered statements. Every call is one statement with no cross-statement transaction.
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_rows(&self, query: &QueryBuf) -> Result<Vec<Row>, StoreError>;

    /// Reads the `count` column of the first row.
    async fn fetch_count(&self, query: &QueryBuf) -> Result<u64, StoreError>;

    /// Returns rows affected.
    async fn execute(&self, query: &QueryBuf) -> Result<u64, StoreError>;
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

fn bind(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

#[async_trait]
impl Store for PgStore {
    async fn fetch_rows(&self, query: &QueryBuf) -> Result<Vec<Row>, StoreError> {
        let rows = bind(query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_count(&self, query: &QueryBuf) -> Result<u64, StoreError> {
        use sqlx::Row as _;
        let row = bind(query).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn execute(&self, query: &QueryBuf) -> Result<u64, StoreError> {
        let done = bind(query).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

fn row_to_json(row: &PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<rust_decimal::Decimal>, _>(name) {
        return Value::String(d.to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    undecoded(row, name)
}

/// Enum labels travel as text; anything else unhandled is reported and sent as null.
fn undecoded(row: &PgRow, name: &str) -> Value {
    use sqlx::{Row as _, TypeInfo, ValueRef};
    let Ok(raw) = row.try_get_raw(name) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    let type_info = raw.type_info().into_owned();
    if matches!(type_info.kind(), PgTypeKind::Enum(_)) {
        if let Ok(label) = raw.as_str() {
            return Value::String(label.to_string());
        }
    }
    tracing::debug!(column = name, pg_type = type_info.name(), "column type not decoded");
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn numeric_and_enum_columns_decode_as_text() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPoolOptions::new().max_connections(1).connect(&url).await.unwrap();
        let store = PgStore::new(pool);
        let ddl = QueryBuf {
            sql: "CREATE TYPE pg_temp.category AS ENUM ('topic', 'location')".into(),
            params: Vec::new(),
        };
        store.execute(&ddl).await.unwrap();

        let select = QueryBuf {
            sql: "SELECT 12.50::numeric AS \"amount\", 'topic'::pg_temp.category AS \"category\", \
                  NULL::numeric AS \"missing\""
                .into(),
            params: Vec::new(),
        };
        let rows = store.fetch_rows(&select).await.unwrap();
        assert_eq!(rows[0]["amount"], Value::String("12.50".into()));
        assert_eq!(rows[0]["category"], Value::String("topic".into()));
        assert_eq!(rows[0]["missing"], Value::Null);
    }
}
