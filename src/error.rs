// src/error.rs
//! Input validation errors surfaced by the engine and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum HoneypotError {
    #[error("sessionId is required")]
    MissingSessionId,

    #[error("sessionId exceeds {max} characters")]
    SessionIdTooLong { max: usize },

    #[error("message text is required")]
    EmptyMessage,

    #[error("message text is {len} characters, limit is {max}")]
    MessageTooLong { len: usize, max: usize },

    /// Anything unexpected inside the pipeline. Callers still get a decoy reply.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HoneypotError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HoneypotError::MissingSessionId
            | HoneypotError::SessionIdTooLong { .. }
            | HoneypotError::EmptyMessage
            | HoneypotError::MessageTooLong { .. } => StatusCode::BAD_REQUEST,
            HoneypotError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl IntoResponse for HoneypotError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // internals stay in the logs
            HoneypotError::Internal(e) => {
                tracing::error!(target: "honeypot", "internal error: {e:#}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorBody {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}
