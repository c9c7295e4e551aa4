//! Extract the authenticated actor placed in request extensions by authentication middleware.

use crate::request::Actor;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Optional caller identity. Absent when no middleware authenticated the request.
#[derive(Clone, Debug, Default)]
pub struct MaybeActor(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeActor(parts.extensions.get::<Actor>().cloned()))
    }
}
