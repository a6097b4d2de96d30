//! Error types for the clustered cache
//!
//! Provides unified error handling using thiserror. Payload codec failures are
//! deliberately absent here: they are recovered inside the cache layer and
//! never reach a caller of the map contract.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the clustered cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The shared entry store failed or is unavailable
    #[error("Store error: {0}")]
    Store(String),

    /// A cache instance was built without its repository or codec
    #[error("Missing shared context: {0}")]
    MissingContext(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::MissingContext(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the clustered cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (CacheError::Store("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (CacheError::NotFound("nope".into()), StatusCode::NOT_FOUND),
            (
                CacheError::MissingContext("repository".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::MissingContext("codec".to_string());
        assert_eq!(err.to_string(), "Missing shared context: codec");
    }
}
