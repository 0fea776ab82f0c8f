use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{db::DbError, services::RecoveryError, signals::SignalError};

/// JSON error body: `{"error": code, "message": ...}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// Error returned by API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn database_required() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "database_required",
            "Database not configured",
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::new(StatusCode::NOT_FOUND, "not_found", "Resource not found"),
            DbError::Conflict(msg) => Self::new(StatusCode::CONFLICT, "conflict", msg),
            DbError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, "validation_error", msg),
            DbError::NotConfigured => Self::database_required(),
            _ => {
                tracing::error!(error = %err, "Database error");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "An internal database error occurred",
                )
            }
        }
    }
}

impl From<SignalError> for ApiError {
    fn from(err: SignalError) -> Self {
        match err {
            SignalError::NotFound => {
                Self::new(StatusCode::NOT_FOUND, "not_found", "Signal not found")
            }
            SignalError::DispatchQueueFull => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "dispatch_queue_full",
                "Live dispatch queue is full, retry later",
            ),
            SignalError::BadDataType | SignalError::Cache(_) => {
                tracing::error!(error = %err, "Signal queue error");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "signal_error",
                    err.to_string(),
                )
            }
        }
    }
}

impl From<RecoveryError> for ApiError {
    fn from(err: RecoveryError) -> Self {
        match err {
            RecoveryError::RecordNotFound(id) => Self::new(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Record {id} not found"),
            ),
            RecoveryError::MissingArchiveId(_) | RecoveryError::NoVault(_) => {
                Self::new(StatusCode::CONFLICT, "not_recoverable", err.to_string())
            }
            RecoveryError::Archive(ref e) => {
                tracing::error!(error = %e, "Recovery job submission failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "job_submission_failed",
                    e.to_string(),
                )
            }
            RecoveryError::Db(e) => e.into(),
            RecoveryError::Signal(e) => e.into(),
        }
    }
}
