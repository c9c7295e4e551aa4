//! HTTP rendering of CRUD results: collection metadata headers, creation links, hook take-overs.

use crate::hooks::HookOutcome;
use crate::service::{Created, Listing};
use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

pub const X_LENGTH: &str = "x-length";
pub const X_TOTAL_LENGTH: &str = "x-total-length";
pub const X_FIRST: &str = "x-first";
pub const X_LAST: &str = "x-last";
pub const X_NEXT: &str = "x-next";
pub const X_PREV: &str = "x-prev";
const LINK: &str = "link";

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(HeaderName::from_static(name), v);
        }
        Err(e) => tracing::warn!(header = name, error = %e, "dropping unrepresentable header"),
    }
}

impl IntoResponse for HookOutcome {
    fn into_response(self) -> Response {
        match self {
            HookOutcome::Send(body) => (StatusCode::OK, Json(body)).into_response(),
            HookOutcome::TakeOver { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                (status, Json(body)).into_response()
            }
        }
    }
}

impl IntoResponse for Listing {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, X_LENGTH, &self.length.to_string());
        insert_header(&mut headers, X_TOTAL_LENGTH, &self.total.to_string());
        if let Some(links) = &self.links {
            insert_header(&mut headers, X_FIRST, &links.first);
            insert_header(&mut headers, X_LAST, &links.last);
            insert_header(&mut headers, X_NEXT, &links.next);
            insert_header(&mut headers, X_PREV, &links.prev);
        }
        (headers, self.outcome).into_response()
    }
}

impl IntoResponse for Created {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(location) = &self.location {
            insert_header(&mut headers, LINK, location);
        }
        match self.body {
            Some(body) => (StatusCode::CREATED, headers, Json(body)).into_response(),
            None => (StatusCode::CREATED, headers).into_response(),
        }
    }
}
