//! API error handling with plain-text responses.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::backend::BackendError;

/// API error type.
///
/// Every variant is produced before any stream byte is sent, so each one can
/// still choose the response status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The task backend refused the request; its status is passed through.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn upstream(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Upstream { .. } => "BACKEND_REJECTED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::Internal(msg) => {
                error!(error_code = code, message = %msg, "API error");
            }
            ApiError::Upstream { status, message } => {
                warn!(error_code = code, status = status.as_u16(), message = %message, "Backend rejected request");
            }
            ApiError::BadRequest(_) => {
                tracing::debug!(error_code = code, message = %message, "Client error");
            }
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { status, .. } => ApiError::upstream(status, err.to_string()),
            BackendError::Unreachable { .. }
            | BackendError::InvalidHeader { .. }
            | BackendError::Client(_) => ApiError::internal(err.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status_codes() {
        assert_eq!(ApiError::bad_request("").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::upstream(StatusCode::FORBIDDEN, "").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::internal("").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_backend_rejection_keeps_status() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let err = ApiError::from(BackendError::Rejected {
                status,
                detail: "nope".to_string(),
            });
            assert_eq!(err.status_code(), status);
            assert!(err.to_string().ends_with(": nope"));
        }
    }

    #[test]
    fn test_unreachable_backend_is_internal_error() {
        let err = ApiError::from(BackendError::Unreachable {
            url: "http://127.0.0.1:1/v1/agents/a/tasks/".to_string(),
            message: "connection refused".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_error_body_is_plain_text() {
        let response = ApiError::bad_request("agentId is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Bad request: agentId is required");
    }
}
