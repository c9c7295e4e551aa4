//! Example consumer: serves the resources configured under `RESOURCE_CONFIG`.
//!
//! Run from repo root: `RESOURCE_CONFIG=example_consumer/resources cargo run -p example-consumer`

use resource_sdk::{load_from_path, resolve, resource_routes, AppState, HookOutcome, PgStore, ResponseHook, Settings};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Private groups are reported as absent instead of being returned.
struct HidePrivateGroups;

impl ResponseHook for HidePrivateGroups {
    fn single(&self, envelope: Value) -> HookOutcome {
        if envelope.get("isPublic") == Some(&Value::Bool(false)) {
            return HookOutcome::TakeOver {
                status: 404,
                body: serde_json::json!({ "error": { "code": "not_found", "message": "not found" } }),
            };
        }
        HookOutcome::Send(envelope)
    }

    fn collection(&self, envelopes: Vec<Value>) -> HookOutcome {
        let visible = envelopes
            .into_iter()
            .filter(|e| e.get("isPublic") != Some(&Value::Bool(false)))
            .collect();
        HookOutcome::Send(Value::Array(visible))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("resource_sdk=info")),
        )
        .init();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;

    let configs = load_from_path(&settings.resource_config).await?;
    let mut registry = resolve(&configs)?;
    if registry.get("groups").is_some() {
        registry.register_hook("groups", Arc::new(HidePrivateGroups))?;
    }

    let state = AppState::new(Arc::new(PgStore::new(pool)), registry, &settings.base_url);
    let app = resource_routes(state, settings.body_limit);
    let listener = TcpListener::bind(&settings.listen_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
