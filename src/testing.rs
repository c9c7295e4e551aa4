//! Test fixtures: a small resource registry and a scripted, recording `Store`.

use crate::config::{resolve, Registry, ResourceConfig};
use crate::error::StoreError;
use crate::sql::{QueryBuf, SqlValue};
use crate::store::{Row, Store};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn fixture_configs() -> Vec<ResourceConfig> {
    serde_json::from_value(json!([
        {
            "name": "users",
            "table": "fos_user",
            "primary_key": "id",
            "upsert_noop_column": "email_canonical",
            "hidden": ["password"],
            "fields": {
                "id": { "type": "int", "props": ["default", "read-only"] },
                "username": { "type": "string", "props": ["default", "required"] },
                "email": { "type": "string" },
                "email_canonical": { "type": "string", "props": ["no-filter"] },
                "password": { "type": "string", "props": ["no-filter"] },
                "entries": {
                    "type": { "resource": "entries" },
                    "props": ["no-filter"],
                    "rel": "has_many",
                    "mapping": "creator_id",
                    "limit": 10,
                    "sort_by": "created_at"
                }
            }
        },
        {
            "name": "lists",
            "table": "entry_set",
            "primary_key": "id",
            "fields": {
                "id": { "type": "int", "props": ["default", "read-only"] },
                "name": { "type": "string", "props": ["default"] },
                "type": { "type": { "one_of": ["idea", "session", "thread"] } },
                "creator_id": { "type": "int" },
                "creator": { "type": { "resource": "users" }, "rel": "belongs_to", "mapping": "creator_id" }
            }
        },
        {
            "name": "entries",
            "table": "idea",
            "primary_key": "id",
            "fields": {
                "id": { "type": "int", "props": ["default", "read-only"] },
                "name": { "type": "string", "props": ["default", "required"] },
                "creator_id": { "type": "int" },
                "list_id": { "type": "int" },
                "created_at": { "type": "timestamp", "initial": { "generator": "now" } },
                "isPrivate": { "type": "bool", "initial": false },
                "creator": {
                    "type": { "resource": "users" },
                    "props": ["default"],
                    "rel": "belongs_to",
                    "mapping": "creator_id"
                },
                "list": { "type": { "resource": "lists" }, "rel": "belongs_to", "mapping": "list_id" }
            }
        },
        {
            "name": "locations",
            "table": "pd_locations",
            "primary_key": "id",
            "fields": {
                "id": { "type": "int" },
                "city": { "type": "string" }
            }
        },
        {
            "name": "groups",
            "table": "pd_groups",
            "primary_key": "id",
            "soft_delete": "deleted",
            "ownership": { "column": "owner_id", "actor_field": "id" },
            "fields": {
                "id": { "type": "int", "props": ["default", "read-only"] },
                "name": { "type": "string", "props": ["default", "required"] },
                "category": { "type": { "one_of": ["topic", "location"] }, "props": ["default"] },
                "deleted": { "type": "bool", "props": ["read-only", "no-filter"] },
                "owner_id": { "type": { "resource": "users" } },
                "location_id": { "type": "int" },
                "owner": {
                    "type": { "resource": "users" },
                    "props": ["default"],
                    "rel": "belongs_to",
                    "mapping": "owner_id"
                },
                "location": {
                    "type": { "resource": "locations" },
                    "props": ["default"],
                    "rel": "belongs_to",
                    "mapping": "location_id"
                },
                "location_detail": {
                    "type": { "resource": "locations" },
                    "props": ["no-filter"],
                    "rel": "belongs_to",
                    "mapping": "location_id"
                }
            }
        }
    ]))
    .unwrap()
}

pub fn fixture_registry() -> Registry {
    resolve(&fixture_configs()).unwrap()
}

/// Serves scripted results in order and records every statement it receives. An empty
/// queue yields no rows, a zero count and zero rows affected.
#[derive(Default)]
pub struct MockStore {
    rows: Mutex<VecDeque<Result<Vec<Row>, StoreError>>>,
    counts: Mutex<VecDeque<u64>>,
    affected: Mutex<VecDeque<u64>>,
    log: Mutex<Vec<(String, Vec<SqlValue>)>>,
}

impl MockStore {
    pub fn with_rows(self, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        self.rows.lock().unwrap().push_back(Ok(rows));
        self
    }

    pub fn with_error(self, err: StoreError) -> Self {
        self.rows.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_count(self, count: u64) -> Self {
        self.counts.lock().unwrap().push_back(count);
        self
    }

    pub fn with_affected(self, affected: u64) -> Self {
        self.affected.lock().unwrap().push_back(affected);
        self
    }

    pub fn statements(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|(sql, _)| sql).collect()
    }

    fn record(&self, query: &QueryBuf) {
        self.log
            .lock()
            .unwrap()
            .push((query.sql.clone(), query.params.clone()));
    }
}

#[async_trait]
impl Store for MockStore {
    async fn fetch_rows(&self, query: &QueryBuf) -> Result<Vec<Row>, StoreError> {
        self.record(query);
        self.rows.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_count(&self, query: &QueryBuf) -> Result<u64, StoreError> {
        self.record(query);
        Ok(self.counts.lock().unwrap().pop_front().unwrap_or(0))
    }

    async fn execute(&self, query: &QueryBuf) -> Result<u64, StoreError> {
        self.record(query);
        Ok(self.affected.lock().unwrap().pop_front().unwrap_or(0))
    }
}
