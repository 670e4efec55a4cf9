//! HTTP error responses.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::Error;

/// Errors returned by handlers. The body is `{"detail": "<message>"}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// An error from the service layer.
    #[error(transparent)]
    Service(#[from] Error),

    /// The request could not be understood.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::Service(err) if err.is_conflict() => StatusCode::CONFLICT,
            Self::Service(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(Error::question_not_found("Q_1")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Error::profile_exists("a@b.c")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(Error::validation("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::internal("x")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_message_is_transparent() {
        let err = ApiError::from(Error::ProfileNotFound { id: 3 });
        assert_eq!(err.to_string(), "Usuario con ID 3 no encontrado");
    }
}
