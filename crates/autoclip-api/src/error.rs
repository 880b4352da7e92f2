//! API error types: the single translation point from every internal error
//! type to the §7 taxonomy and an HTTP status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("busy")]
    Busy,

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] autoclip_storage::StorageError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] autoclip_scheduler::SchedulerError),

    #[error("media error: {0}")]
    Media(#[from] autoclip_media::MediaError),

    #[error("worker error: {0}")]
    Worker(#[from] autoclip_worker::WorkerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<autoclip_stt::SttError> for ApiError {
    fn from(err: autoclip_stt::SttError) -> Self {
        ApiError::Worker(autoclip_worker::WorkerError::from(err))
    }
}

impl ApiError {
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
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy => StatusCode::TOO_MANY_REQUESTS,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Scheduler(autoclip_scheduler::SchedulerError::JobNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Scheduler(_) | ApiError::Media(_) | ApiError::Worker(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production (§7).
        let message = match &self {
            ApiError::Scheduler(autoclip_scheduler::SchedulerError::JobNotFound(_)) => self.to_string(),
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Scheduler(_) | ApiError::Media(_) | ApiError::Worker(_) | ApiError::Io(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            ApiError::Busy => "busy".to_string(),
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
