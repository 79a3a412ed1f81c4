//! Error types for the search service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Service-level errors that can occur during operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Index file not found: {0}")]
    IndexNotFound(String),

    #[error("Failed to load vector index: {0}")]
    IndexLoad(String),

    #[error("Failed to load metadata: {0}")]
    MetadataLoad(String),

    #[error("No metadata record for ordinal {0}")]
    MetadataMissing(u32),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::IndexNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::IndexLoad(_)
            | ServiceError::MetadataLoad(_)
            | ServiceError::MetadataMissing(_)
            | ServiceError::Embedding(_)
            | ServiceError::Search(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
