//! Error types for the portal server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::external::DirectoryError;
use crate::sync::SyncError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong admin key / webhook secret (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict (409), e.g. a duplicate slug or field key
    #[error("Conflict: {0}")]
    Conflict(String),

    /// External datastore failed or is not configured (502)
    #[error("External datastore error: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// portal-common error
    #[error("Common error: {0}")]
    Common(portal_common::Error),
}

impl From<portal_common::Error> for ApiError {
    fn from(err: portal_common::Error) -> Self {
        match err {
            portal_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            portal_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            portal_common::Error::Database(ref db_err) if is_unique_violation(db_err) => {
                ApiError::Conflict(db_err.to_string())
            }
            other => ApiError::Common(other),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Directory(e) => e.into(),
            SyncError::Local(e) => e.into(),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "EXTERNAL_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::BadGateway("x".into()), StatusCode::BAD_GATEWAY),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_common_errors_keep_meaning() {
        let not_found: ApiError = portal_common::Error::NotFound("project".into()).into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let invalid: ApiError = portal_common::Error::InvalidInput("bad".into()).into();
        assert!(matches!(invalid, ApiError::BadRequest(_)));

        let missing: ApiError = SyncError::Directory(DirectoryError::NotConfigured).into();
        assert!(matches!(missing, ApiError::BadGateway(_)));
    }
}
