//! Resource SDK: schema-driven REST resources over PostgreSQL.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod hooks;
pub mod query;
pub mod request;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{load_from_path, resolve, Registry, ResourceConfig, Settings};
pub use error::{AppError, SchemaError, StoreError};
pub use hooks::{HookOutcome, ResponseHook};
pub use request::{Actor, QueryParams, ResourceRequest};
pub use routes::resource_routes;
pub use schema::ResourceSchema;
pub use service::CrudService;
pub use state::AppState;
pub use store::{PgStore, Store};
