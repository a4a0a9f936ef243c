//! Error types for the Audio Download HTTP API
//!
//! Every handler returns `ApiResult<T>`; failures render as a JSON
//! envelope `{"error": {"code", "message"}}` with a matching HTTP
//! status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::services::extractor::ExtractError;
use crate::services::registry::RegistryError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Request was malformed or invalid
    #[error("{0}")]
    BadRequest(String),

    /// Media extraction failed
    #[error("{0}")]
    Extraction(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("{0}")]
    Internal(String),

    /// Shared library error
    #[error(transparent)]
    Common(#[from] tapedeck_common::Error),

    /// Catch-all for wrapped errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(msg) => ApiError::NotFound(msg),
            RegistryError::InvalidName(msg) => ApiError::BadRequest(msg),
            RegistryError::Io(e) => ApiError::Io(e),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        ApiError::Extraction(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Extraction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXTRACTION_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            ApiError::Internal(_) | ApiError::Common(_) | ApiError::Other(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            })),
        )
            .into_response()
    }
}

/// Result alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
