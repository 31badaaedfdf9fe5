//! Error types for the relay
//!
//! Every failure that reaches a client is rendered as a single
//! `{"error": "..."}` object.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned when the upstream cannot be reached at all
pub const UNREACHABLE_MESSAGE: &str = "Couldn't reach the server";

/// Message returned when the upstream answers with a failure
pub const BAD_UPSTREAM_MESSAGE: &str = "Failed to fetch from Ollama";

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    #[error("Upstream returned status {status}")]
    UpstreamBadResponse { status: u16 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UpstreamUnreachable(_) => "unreachable",
            AppError::UpstreamBadResponse { .. } => "bad_response",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::UpstreamUnreachable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                UNREACHABLE_MESSAGE.to_string(),
            ),
            AppError::UpstreamBadResponse { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                BAD_UPSTREAM_MESSAGE.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
