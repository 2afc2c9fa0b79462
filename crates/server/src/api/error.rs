//! Mapping of engine errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use demolot_core::{AuditError, DemoError, MemberError};
use serde::Serialize;
use tracing::error;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed API call: status code plus a `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<DemoError> for ApiError {
    fn from(err: DemoError) -> Self {
        let status = match &err {
            DemoError::NotFound(_) | DemoError::TaskNotFound { .. } | DemoError::MemberNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DemoError::InvalidStateTransition { .. }
            | DemoError::ConcurrentModification { .. }
            | DemoError::DuplicateTaskKey { .. } => StatusCode::CONFLICT,
            DemoError::Validation(_) => StatusCode::BAD_REQUEST,
            DemoError::Members(_) | DemoError::Database(_) => {
                error!("Storage failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<MemberError> for ApiError {
    fn from(err: MemberError) -> Self {
        let status = match &err {
            MemberError::NotFound(_) => StatusCode::NOT_FOUND,
            MemberError::Validation(_) => StatusCode::BAD_REQUEST,
            MemberError::Database(_) => {
                error!("Storage failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        error!("Audit trail failure: {}", err);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read audit events: {}", err),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
