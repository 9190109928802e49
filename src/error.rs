use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

const INTERNAL: &str = "Internal server error";

/// Failures that can surface from a handler. All of them are reported to the
/// client as a 500 with the same body shape.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database connection unavailable: {0}")]
    Acquire(#[source] sqlx::Error),

    #[error("database query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl AppError {
    fn summary(&self) -> &'static str {
        match self {
            AppError::Acquire(_) => "database connection unavailable",
            AppError::Query(_) => "database query failed",
        }
    }

    /// Raw driver text is only handed out when explicitly enabled.
    pub fn into_response_with(self, expose_details: bool) -> Response {
        tracing::error!(error = %self, "Database error");
        let details = if expose_details {
            match &self {
                AppError::Acquire(e) | AppError::Query(e) => e.to_string(),
            }
        } else {
            self.summary().to_string()
        };
        ErrorBody::new(INTERNAL, details).into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }

    pub fn bare(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

pub async fn not_found() -> Response {
    ErrorBody::bare("Not found").into_response_with(StatusCode::NOT_FOUND)
}

/// Method fallback for routes that exist but only answer other verbs.
pub async fn method_not_allowed() -> Response {
    ErrorBody::bare("Method not allowed").into_response_with(StatusCode::METHOD_NOT_ALLOWED)
}

/// Used by `CatchPanicLayer` so a panicking handler still answers with JSON.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %message, "handler panicked");
    ErrorBody::new(INTERNAL, "unexpected failure")
        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}
