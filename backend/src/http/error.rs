//! HTTP error handling.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;

use super::envelope::Envelope;
use crate::batch::BatchError;
use crate::upstream::UpstreamError;

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error, unreadable query or body)
    BadRequest(String),
    /// No route matches the request
    NotFound { path: String },
    /// The upstream catalog failed a single-resource call
    Upstream(UpstreamError),
    /// Internal server error
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn into_envelope(self) -> Envelope {
        let code = self.code();
        let envelope = match self {
            AppError::BadRequest(msg) => Envelope::failure(msg),
            AppError::NotFound { path } => Envelope::failure("Endpoint not found").with("path", path),
            AppError::Upstream(err) => Envelope::failure(err.message()),
            AppError::Internal(msg) => {
                Envelope::failure("Internal server error").with("message", msg)
            }
        };
        envelope.with("code", code)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            AppError::NotFound { path } => write!(f, "no route for {}", path),
            AppError::Upstream(err) => write!(f, "upstream: {}", err),
            AppError::Internal(msg) => write!(f, "internal: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::Upstream(err)
    }
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
