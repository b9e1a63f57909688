use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::{
    JobQueueError, PathGuardError, RejectionKind, WebhookGuardError,
};
use crate::domain::UnknownParser;

pub const QUEUE_FULL_RETRY_SECS: u64 = 300;

/// Every failure the HTTP surface reports. Internal detail is logged when
/// the response is built and never sent to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    RateLimited { message: String, retry_after_secs: u64 },
    #[error("Service temporarily unavailable (circuit breaker open)")]
    CircuitOpen { retry_after_secs: u64 },
    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited {
                retry_after_secs, ..
            }
            | ApiError::CircuitOpen { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    fn from_rejection(kind: RejectionKind, message: String) -> Self {
        match kind {
            RejectionKind::InvalidInput => ApiError::InvalidInput(message),
            RejectionKind::PermissionDenied => ApiError::PermissionDenied(message),
            RejectionKind::NotFound => ApiError::NotFound(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }

        let status = self.status();
        let retry_after = self.retry_after();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after
            && let Ok(value) = HeaderValue::from_str(&secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

impl From<PathGuardError> for ApiError {
    fn from(e: PathGuardError) -> Self {
        ApiError::from_rejection(e.kind(), e.to_string())
    }
}

impl From<WebhookGuardError> for ApiError {
    fn from(e: WebhookGuardError) -> Self {
        ApiError::from_rejection(e.kind(), e.to_string())
    }
}

impl From<UnknownParser> for ApiError {
    fn from(e: UnknownParser) -> Self {
        ApiError::InvalidInput(e.to_string())
    }
}

impl From<JobQueueError> for ApiError {
    fn from(e: JobQueueError) -> Self {
        match e {
            JobQueueError::Full { capacity } => ApiError::RateLimited {
                message: format!("Too many jobs queued (max {capacity})"),
                retry_after_secs: QUEUE_FULL_RETRY_SECS,
            },
            JobQueueError::Closed => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::BytesRejection(_) => {
                ApiError::InvalidInput("Request body too large or unreadable".to_string())
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::InvalidInput("Expected a JSON body".to_string())
            }
            _ => ApiError::InvalidInput("Invalid JSON body".to_string()),
        }
    }
}
