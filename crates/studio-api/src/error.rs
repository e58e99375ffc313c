//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use studio_pipeline::PipelineError;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted from a state that forbids it
    #[error("{0}")]
    InvalidState(String),

    #[error("Store error: {0}")]
    Store(#[from] studio_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] studio_queue::QueueError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Store(_) | ApiError::Queue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Validation(_) => Some("validation_error"),
            ApiError::InvalidState(_) => Some("invalid_state_transition"),
            ApiError::Conflict(_) => Some("conflict"),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Internal(_) | ApiError::Store(_) | ApiError::Queue(_)
        )
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(msg) => ApiError::Validation(msg),
            PipelineError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} {}", entity, id))
            }
            PipelineError::AccessDenied(msg) => ApiError::Forbidden(msg),
            PipelineError::InvalidStateTransition(e) => ApiError::InvalidState(e.to_string()),
            PipelineError::Contended(what) => {
                ApiError::Conflict(format!("{} is being updated, please retry", what))
            }
            PipelineError::Store(e) => ApiError::Store(e),
            PipelineError::Queue(e) => ApiError::Queue(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if self.is_internal() {
            error!("Request failed: {}", self);
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}
