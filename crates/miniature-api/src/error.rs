//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use miniature_core::MiniatureError;
use serde::{Deserialize, Serialize};

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Always `true`, so clients can branch on the field alone
    pub error: bool,
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: true,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden() -> Self {
        Self::new("FORBIDDEN", "Forbidden")
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new("CONSTRAINT_VIOLATION", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    /// Attach a status and render
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden,
    Unprocessable(String),
    /// Details are logged, never sent to the client
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(resource) => (StatusCode::NOT_FOUND, ApiError::not_found(&resource)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ApiError::unauthorized(msg)),
            AppError::Forbidden => (StatusCode::FORBIDDEN, ApiError::forbidden()),
            AppError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ApiError::unprocessable(msg))
            }
            AppError::Upstream(details) => {
                tracing::error!(error = %details, "Request failed on a backing service");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        error.into_response_with(status)
    }
}

impl From<MiniatureError> for AppError {
    fn from(err: MiniatureError) -> Self {
        match err {
            MiniatureError::NotFound(resource) => AppError::NotFound(resource),
            MiniatureError::InvalidCredentials => {
                AppError::Unauthorized("Invalid username or password".to_string())
            }
            MiniatureError::ConstraintViolation(msg) => AppError::Unprocessable(msg),
            MiniatureError::InvalidToken => AppError::Forbidden,
            MiniatureError::UpstreamFailure(msg) => AppError::Upstream(msg),
            MiniatureError::Other(err) => AppError::Upstream(format!("{err:#}")),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
