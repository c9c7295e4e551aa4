//! Resource handlers: list, read, create, delete. The resource is resolved from its path segment.

use crate::error::AppError;
use crate::extractors::MaybeActor;
use crate::hooks::HookOutcome;
use crate::request::{QueryParams, ResourceRequest};
use crate::schema::ResourceSchema;
use crate::service::{Created, Listing};
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

fn resource<'s>(state: &'s AppState, path_segment: &str) -> Result<&'s ResourceSchema, AppError> {
    state
        .registry
        .by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("resource {}", path_segment)))
}

fn resource_request(uri: &OriginalUri, actor: MaybeActor) -> ResourceRequest {
    ResourceRequest {
        path: uri.path().to_string(),
        params: QueryParams::parse(uri.query().unwrap_or("")),
        actor: actor.0,
    }
}

/// The collection path a created record's `Link` is built from, with any trailing slash removed.
fn collection_request(uri: &OriginalUri, actor: MaybeActor) -> ResourceRequest {
    let mut req = resource_request(uri, actor);
    req.path = req.path.trim_end_matches('/').to_string();
    req
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    uri: OriginalUri,
    actor: MaybeActor,
) -> Result<Listing, AppError> {
    let schema = resource(&state, &path_segment)?;
    let req = resource_request(&uri, actor);
    state.crud().find_all(schema, &req).await
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    uri: OriginalUri,
    actor: MaybeActor,
) -> Result<HookOutcome, AppError> {
    let schema = resource(&state, &path_segment)?;
    let req = resource_request(&uri, actor);
    state.crud().find_by_primary_key(schema, &id, &req).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    uri: OriginalUri,
    actor: MaybeActor,
    Json(body): Json<Value>,
) -> Result<Created, AppError> {
    let schema = resource(&state, &path_segment)?;
    let req = collection_request(&uri, actor);
    state.crud().create(schema, &req, body).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    uri: OriginalUri,
    actor: MaybeActor,
) -> Result<StatusCode, AppError> {
    let schema = resource(&state, &path_segment)?;
    let req = resource_request(&uri, actor);
    state.crud().delete_by_primary_key(schema, &id, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}
