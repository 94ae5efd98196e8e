//! Mapping of gateway failures to HTTP responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{BackendError, ValidationError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}

/// Error returned by route handlers
#[derive(Debug)]
pub enum ApiError {
    /// Undecodable or out-of-bounds request, rejected before submission
    InvalidRequest { status: StatusCode, message: String },
    /// Failure while submitting or resolving the generation
    Backend(BackendError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::InvalidRequest {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::Backend(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, r#type) = match self {
            ApiError::InvalidRequest { status, message } => {
                tracing::debug!("Rejected request: {}", message);
                (status, message, "invalid_request_error")
            }
            ApiError::Backend(
                err @ (BackendError::ShuttingDown | BackendError::QueueFull(_)),
            ) => {
                tracing::warn!("Generation refused: {}", err);
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string(), "server_error")
            }
            ApiError::Backend(err) => {
                tracing::error!("Generation failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "generation failed".to_string(),
                    "server_error",
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                message,
                r#type: r#type.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
