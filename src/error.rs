// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{enrollment::EnrollmentError, store::StoreError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 503 Service Unavailable (storage layer unreachable)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service Unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage is unavailable, retry the whole request".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            // Per-record conflicts reach clients as per-item batch failures;
            // the remaining store calls (listing, soft delete) touch no
            // unique or foreign key.
            StoreError::Duplicate(msg) | StoreError::Constraint(msg) => AppError::BadRequest(msg),
            StoreError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            EnrollmentError::TaskFailed(msg) => AppError::InternalServerError(msg),
        }
    }
}
