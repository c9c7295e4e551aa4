//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: resource {resource} field {field}")]
    InvalidPrimaryKey { resource: String, field: String },
    #[error("unknown type '{type_name}' for {resource}.{field}")]
    UnknownType {
        resource: String,
        field: String,
        type_name: String,
    },
    #[error("unknown property '{prop}' for {resource}.{field}")]
    UnknownProperty {
        resource: String,
        field: String,
        prop: String,
    },
    #[error("invalid relation {resource}.{field}: {reason}")]
    InvalidRelation {
        resource: String,
        field: String,
        reason: String,
    },
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("config load: {0}")]
    Load(String),
}

/// Failure reported by the query executor, classified by constraint category.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("undefined column: {0}")]
    UndefinedColumn(String),
    #[error("{0}")]
    Other(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned());
        let message = e.to_string();
        match code.as_deref() {
            Some("23503") => StoreError::ForeignKeyViolation(message),
            Some("23505") => StoreError::UniqueViolation(message),
            Some("42703") => StoreError::UndefinedColumn(message),
            _ => StoreError::Other(message),
        }
    }
}

impl StoreError {
    /// Message surfaced to callers when an insert fails.
    pub fn create_message(&self) -> &'static str {
        match self {
            StoreError::ForeignKeyViolation(_) => "Referenced object could not be found",
            StoreError::UniqueViolation(_) => "Duplicate entry",
            StoreError::UndefinedColumn(_) => "A field was not recognized",
            StoreError::Other(_) => "Internal Error",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Store(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "store failure");
        AppError::Store("database error".into())
    }
}

impl AppError {
    pub fn invalid_value(value: &str, field: &str) -> Self {
        AppError::InvalidArgument(format!("'{}' invalid for {}", value, field))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Schema(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidArgument(_) | AppError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Schema(_) => "schema_error",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::MissingParameter(_) => "missing_parameter",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Store(_) => "store_error",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
