//! Shared-secret authorization gate
//!
//! A single API key protects every mutating route and all statistics.
//! The habit listing (GET /habits) is intentionally left open - the
//! read-only list predates the key and the frontend depends on it.

use axum::http::HeaderMap;

use super::error::ApiError;
use crate::config::Config;

/// Header carrying the shared secret
const API_KEY_HEADER: &str = "x-api-key";

/// Require a matching x-api-key header. With no key configured, protected
/// routes always answer 401 - same as the original deployment with an
/// unset API_KEY.
pub fn require_api_key(headers: &HeaderMap, config: &Config) -> Result<(), ApiError> {
    let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    match (&config.api_key, presented) {
        (Some(expected), Some(given)) if given == expected => Ok(()),
        _ => Err(ApiError::Unauthorized("Invalid API key".to_string())),
    }
}
