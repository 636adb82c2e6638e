use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::domain::ErrorKind;
use crate::services::{AccountError, AuthError};

/// Error returned by every handler. Built once from a service error and
/// rendered without further inspection.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub field: Option<&'static str>,
    pub retry_after_secs: Option<u64>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::IdentifierConflict => StatusCode::CONFLICT,
        ErrorKind::AccountNotFound => StatusCode::NOT_FOUND,
        ErrorKind::CannotDeleteSelf
        | ErrorKind::LastAdmin
        | ErrorKind::CannotUpdateDeleted
        | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidCredentials
        | ErrorKind::AccountDisabled
        | ErrorKind::AccountDeleted
        | ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Locked => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);

        let message = if self.kind == ErrorKind::Internal {
            tracing::error!("Internal error: {}", self.message);
            "An internal error occurred".to_string()
        } else {
            tracing::debug!(code = self.kind.code(), "Request rejected: {}", self.message);
            self.message
        };

        let body = ApiResponse::<()>::failure(message, self.kind, self.field);
        let mut response = (status, Json(body)).into_response();

        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        Self {
            kind: err.kind(),
            field: err.field(),
            message: err.to_string(),
            retry_after_secs: None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self {
            kind: err.kind(),
            field: err.field(),
            retry_after_secs: err.retry_after_secs(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            retry_after_secs: None,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }

    #[must_use]
    pub const fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::AccountNotFound, format!("{resource} {id} not found"))
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized, "Authentication required")
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden, "Administrator privileges required")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, AdminAction};
    use std::time::Duration;

    #[test]
    fn lifecycle_errors_map_to_fixed_statuses() {
        let cases = [
            (
                AccountError::IdentifierConflict("1000".into()),
                StatusCode::CONFLICT,
            ),
            (AccountError::CannotDeleteSelf, StatusCode::BAD_REQUEST),
            (
                AccountError::LastAdmin(AdminAction::Delete),
                StatusCode::BAD_REQUEST,
            ),
            (AccountError::CannotUpdateDeleted, StatusCode::BAD_REQUEST),
            (
                AccountError::NotFound(AccountId::new(9)),
                StatusCode::NOT_FOUND,
            ),
            (
                AccountError::Database("disk I/O error".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn locked_sets_retry_after() {
        let err = ApiError::from(AuthError::Locked {
            retry_after: Duration::from_secs(42),
        });
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(42u64)
        );
    }

    #[test]
    fn conflict_carries_field() {
        let err = ApiError::from(AccountError::IdentifierConflict("1000".into()));
        assert_eq!(err.field, Some("login_identifier"));
        assert_eq!(err.kind, ErrorKind::IdentifierConflict);
    }
}
