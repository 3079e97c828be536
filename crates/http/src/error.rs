//! Error handling for the shelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::{Timestamp, Uuid};

use crate::envelope::{Envelope, ErrorBody};

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        body: Option<String>,
    },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("service unavailable: {message}")]
    Unavailable {
        message: String,
        body: Option<String>,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            body: None,
        }
    }

    /// Create a bad request error with a detail body
    pub fn bad_request_with(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a service unavailable error
    pub fn unavailable(message: impl Into<String>, body: Option<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Join an error's source chain, skipping the top-level message.
fn source_chain(err: &anyhow::Error) -> Option<String> {
    let causes: Vec<String> = err.chain().skip(1).map(|cause| cause.to_string()).collect();
    if causes.is_empty() {
        None
    } else {
        Some(causes.join(": "))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v7(Timestamp::now(uuid::NoContext));
        let status = self.status();

        let (message, body) = match self {
            AppError::BadRequest { message, body } => (message, body),
            AppError::NotFound { message } => (message, None),
            AppError::Unavailable { message, body } => (message, body),
            AppError::Internal(e) => (e.to_string(), source_chain(&e)),
        };

        tracing::error!(
            error_id = %error_id,
            status_code = %status.as_u16(),
            error = %message,
            detail = body.as_deref().unwrap_or(""),
            "Request error"
        );

        // Internal details stay in the log for release builds
        let (message, body) =
            if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR {
                (
                    format!("An internal server error occurred (error id {error_id})"),
                    None,
                )
            } else {
                (message, body)
            };

        let envelope: Envelope = Envelope::failure(status, ErrorBody::new(message, body));
        (status, Json(envelope)).into_response()
    }
}
