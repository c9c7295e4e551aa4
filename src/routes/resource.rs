//! Resource CRUD routes built from the registry's path segments.

use crate::handlers::resource::{create, delete as delete_handler, list, read};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn resource_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route("/:path_segment/:id", get(read).delete(delete_handler))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Actor;
    use crate::testing::{fixture_registry, MockStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(store: MockStore) -> (Router, Arc<MockStore>) {
        let store = Arc::new(store);
        let state = AppState::new(store.clone(), fixture_registry(), "http://localhost:3000");
        (resource_routes(state, 1024), store)
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_entries_end_to_end() {
        let (app, _) = app(
            MockStore::default()
                .with_rows(vec![json!({ "idea_name": "alpha" }), json!({ "idea_name": "beta" })])
                .with_count(5),
        );
        let req = Request::get("/entries?fields=name&sort_by=-name&limit=2&offset=0")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers().clone();
        assert_eq!(headers["x-length"], "2");
        assert_eq!(headers["x-total-length"], "5");
        assert_eq!(headers["x-first"], "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2");
        assert_eq!(headers["x-last"], "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2&offset=4");
        assert_eq!(headers["x-next"], "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2&offset=2");
        assert_eq!(headers["x-prev"], "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2");
        assert_eq!(body_json(resp).await, json!([{ "name": "alpha" }, { "name": "beta" }]));
    }

    #[tokio::test]
    async fn unknown_resource_is_404() {
        let (app, store) = app(MockStore::default());
        let resp = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"]["code"], "not_found");
        assert!(store.sql().is_empty());
    }

    #[tokio::test]
    async fn bad_sort_field_is_400() {
        let (app, _) = app(MockStore::default());
        let resp = app
            .oneshot(Request::get("/entries?sort_by=nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["error"]["message"],
            "invalid argument: sort_by field 'nope' not recognized"
        );
    }

    #[tokio::test]
    async fn create_returns_201_with_link() {
        let (app, _) = app(MockStore::default().with_rows(vec![json!({ "id": 12 })]));
        let req = Request::post("/entries")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "name": "camp" }).to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["link"], "http://localhost:3000/entries/12");
    }

    #[tokio::test]
    async fn create_missing_required_is_400() {
        let (app, store) = app(MockStore::default());
        let req = Request::post("/entries")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "list_id": 1 }).to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "missing_parameter");
        assert!(store.sql().is_empty());
    }

    #[tokio::test]
    async fn delete_uses_actor_from_extensions() {
        let (app, store) = app(MockStore::default().with_affected(1));
        let mut req = Request::delete("/groups/3").body(Body::empty()).unwrap();
        req.extensions_mut().insert(Actor::with_id(4));
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(store.sql()[0].starts_with("UPDATE \"pd_groups\""));
    }

    #[tokio::test]
    async fn delete_owned_resource_without_actor_is_401() {
        let (app, _) = app(MockStore::default());
        let resp = app
            .oneshot(Request::delete("/groups/3").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn read_missing_row_is_404() {
        let (app, _) = app(MockStore::default());
        let resp = app
            .oneshot(Request::get("/entries/41").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (app, store) = app(MockStore::default());
        let name = "x".repeat(4096);
        let req = Request::post("/entries")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "name": name }).to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(store.sql().is_empty());
    }
}
