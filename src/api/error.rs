//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::history::HistoryError;
use crate::session::SessionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping. Variants carrying a
/// `&'static str` hold already-localized text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Session required")]
    Unauthorized(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials(&'static str),
    #[error("Investigator role required")]
    Forbidden(&'static str),
    #[error("Patient name required")]
    NameRequired(&'static str),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Delete failed: {detail}")]
    DeleteFailed {
        message: &'static str,
        detail: String,
    },
    #[error("Internal error: {detail}")]
    Internal {
        message: &'static str,
        detail: String,
    },
}

/// Client-facing text for internal errors raised where no session language
/// is known.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

impl ApiError {
    /// Internal error with the default (English) client message.
    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal {
            message: INTERNAL_ERROR_MESSAGE,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                message.to_string(),
            ),
            ApiError::InvalidCredentials(message) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                message.to_string(),
            ),
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", message.to_string())
            }
            ApiError::NameRequired(message) => (
                StatusCode::BAD_REQUEST,
                "NAME_REQUIRED",
                message.to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::DeleteFailed { message, detail } => {
                tracing::error!(detail, "History delete failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DELETE_FAILED",
                    message.to_string(),
                )
            }
            ApiError::Internal { message, detail } => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    message.to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(_: SessionError) -> Self {
        ApiError::Unauthorized("Session expired or unknown")
    }
}
