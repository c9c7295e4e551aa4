//! Process settings read from the environment (a `.env` file is loaded first when present).

use crate::error::SchemaError;
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Prefix for `Link` headers and paging links.
    pub base_url: String,
    pub listen_addr: String,
    pub resource_config: PathBuf,
    pub max_connections: u32,
    pub body_limit: usize,
}

impl Settings {
    pub fn load() -> Result<Self, SchemaError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SchemaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| SchemaError::Load("DATABASE_URL is not set".into()))?;
        let resource_config = lookup("RESOURCE_CONFIG")
            .map(PathBuf::from)
            .ok_or_else(|| SchemaError::Load("RESOURCE_CONFIG is not set".into()))?;
        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .map_err(|_| SchemaError::Load(format!("DATABASE_MAX_CONNECTIONS '{}' is not a number", v)))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let body_limit = match lookup("BODY_LIMIT_BYTES") {
            Some(v) => v
                .parse()
                .map_err(|_| SchemaError::Load(format!("BODY_LIMIT_BYTES '{}' is not a number", v)))?,
            None => DEFAULT_BODY_LIMIT,
        };
        Ok(Settings {
            database_url,
            base_url: lookup("BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into()),
            resource_config,
            max_connections,
            body_limit,
        })
    }
}
