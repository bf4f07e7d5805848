//! Error types for the dashboard
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Suite Error Enum ==
/// Unified error type for the dashboard.
#[derive(Error, Debug)]
pub enum SuiteError {
    /// The request never produced a response (offline, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The origin answered with a non-success status
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// Lookup miss in a cache or JSON document
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payload could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Persistent key-value store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cache population failed while installing the worker
    #[error("Install failed: {0}")]
    InstallFailed(String),

    /// Operation requires an installed worker
    #[error("Service worker is not installed")]
    NotInstalled,

    /// Feature disabled by configuration
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for SuiteError {
    fn from(err: reqwest::Error) -> Self {
        SuiteError::Network(err.to_string())
    }
}

impl From<std::io::Error> for SuiteError {
    fn from(err: std::io::Error) -> Self {
        SuiteError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for SuiteError {
    fn into_response(self) -> Response {
        let status = match &self {
            SuiteError::Network(_) => StatusCode::BAD_GATEWAY,
            SuiteError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            SuiteError::NotFound(_) => StatusCode::NOT_FOUND,
            SuiteError::InvalidRequest(_) | SuiteError::Parse(_) => StatusCode::BAD_REQUEST,
            SuiteError::Unavailable(_) | SuiteError::NotInstalled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SuiteError::Storage(_) | SuiteError::InstallFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the dashboard.
pub type Result<T> = std::result::Result<T, SuiteError>;
