//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::batch::{JobLaunchError, StopError};
use crate::store::StoreError;

/// Application error types
///
/// Every variant renders as the `{success: false, error: {code, message}}`
/// envelope.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict { code, .. } => *code,
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match self {
            AppError::NotFound(message) | AppError::BadRequest(message) => message,
            AppError::Conflict { message, .. } => message,
            AppError::Unavailable(ref cause) => {
                tracing::error!("Store unavailable: {}", cause);
                "The record store is unavailable".to_string()
            },
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                "An internal error occurred".to_string()
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<JobLaunchError> for AppError {
    fn from(err: JobLaunchError) -> Self {
        match err {
            JobLaunchError::InvalidParameters(message) => AppError::BadRequest(message),
            other @ JobLaunchError::Interrupted(_) => AppError::Internal(other.to_string()),
            other => AppError::Conflict {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

impl From<StopError> for AppError {
    fn from(err: StopError) -> Self {
        match err {
            StopError::NotFound(_) => AppError::NotFound(err.to_string()),
            StopError::NotRunning { .. } => AppError::Conflict {
                code: "JOB_NOT_RUNNING",
                message: err.to_string(),
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(message) => AppError::BadRequest(message),
            StoreError::Unavailable(cause) => AppError::Unavailable(cause),
        }
    }
}

impl From<batchline_common::BatchlineError> for AppError {
    fn from(err: batchline_common::BatchlineError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Alias for Result with AppError
pub type ApiResult<T> = Result<T, AppError>;
