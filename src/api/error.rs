//! API error types and response handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::storage::StoreError;

/// Errors a handler can answer with. Every variant maps to the JSON error
/// envelope `{"error": message}` with the matching status code.
#[derive(Debug)]
pub enum ApiError {
    /// Missing/malformed field or duplicate key -> 400
    Validation(String),
    /// Missing or wrong shared secret -> 401
    Unauthorized(String),
    /// Id or date not in the collection -> 404
    NotFound(String),
    /// Collection file unreadable or unwritable -> 500
    Storage(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Storage(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!("API error: {} - {}", status, message);
        } else {
            tracing::debug!("API error: {} - {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
