//! Error types for the Peepin node.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in node operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or bad credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Password hashing or a stored credential failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// Bad configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Proximity core error
    #[error(transparent)]
    Proximity(#[from] peepin_proximity::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl Error {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        use peepin_proximity::Error as Core;

        match self {
            Error::InvalidInput(_) | Error::Proximity(Core::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound(_) | Error::Proximity(Core::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
