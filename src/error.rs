//! Error types for the PDF gate server
//!
//! Every caller-facing failure maps onto a small fixed set of stable
//! UPPER_SNAKE error codes so that clients never see transport-library or
//! filesystem internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::gate::GateError;
use crate::processor::ProcessError;
use crate::streaming::StreamError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("unsupported output format: {0}")]
    InvalidFormat(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    /// Stable caller-facing error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Gate(GateError::QueueFull { .. }) => "QUEUE_FULL",
            AppError::Gate(GateError::Timeout { .. }) => "TIMEOUT",
            AppError::Gate(GateError::ShuttingDown) => "SHUTTING_DOWN",
            AppError::Stream(StreamError::FileTooLarge { .. }) => "FILE_TOO_LARGE",
            AppError::Stream(StreamError::TooManyFiles { .. }) => "TOO_MANY_FILES",
            AppError::Stream(StreamError::UnsupportedMediaType { .. }) => {
                "UNSUPPORTED_MEDIA_TYPE"
            }
            AppError::Stream(StreamError::MissingFile) => "MISSING_FILE",
            AppError::Stream(_) => "STREAM_ERROR",
            AppError::Process(_) => "PROCESSING_FAILED",
            AppError::InvalidFormat(_) => "INVALID_FORMAT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Gate(GateError::QueueFull { .. }) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Gate(GateError::Timeout { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Gate(GateError::ShuttingDown) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Stream(StreamError::FileTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Stream(StreamError::TooManyFiles { .. }) => StatusCode::BAD_REQUEST,
            AppError::Stream(StreamError::UnsupportedMediaType { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::Stream(StreamError::MissingFile) => StatusCode::BAD_REQUEST,
            AppError::Stream(_) => StatusCode::BAD_REQUEST,
            AppError::Process(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed: {}", self);
        } else {
            tracing::debug!(code = self.code(), "request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::StreamError;

    #[test]
    fn gate_errors_map_to_fixed_codes() {
        let err = AppError::Gate(GateError::QueueFull {
            operation: "merge-pdfs".into(),
            max: 10,
        });
        assert_eq!(err.code(), "QUEUE_FULL");
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let err = AppError::Gate(GateError::Timeout {
            operation: "merge-pdfs".into(),
            waited_ms: 5000,
        });
        assert_eq!(err.code(), "TIMEOUT");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn upload_errors_map_to_fixed_codes() {
        let err = AppError::Stream(StreamError::FileTooLarge {
            name: "big.pdf".into(),
            max: 1024,
        });
        assert_eq!(err.code(), "FILE_TOO_LARGE");
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let err = AppError::Stream(StreamError::UnsupportedMediaType {
            got: "text/html".into(),
        });
        assert_eq!(err.code(), "UNSUPPORTED_MEDIA_TYPE");
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn transport_errors_do_not_leak_internals() {
        let err = AppError::Stream(StreamError::Transport(
            "multer: boundary not found at byte 1337".into(),
        ));
        assert_eq!(err.code(), "STREAM_ERROR");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
