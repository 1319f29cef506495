//! Custom error types for the reimbursement service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure a lifecycle operation can report
///
/// Validation and authorization variants carry a message naming the rule
/// that was broken. Persistence failures keep their cause for logging but
/// are rendered to callers as a generic failure.
#[derive(Error, Debug)]
pub enum ErsError {
    #[error("{0}")]
    InvalidAmount(String),

    #[error("{0}")]
    InvalidName(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("{0}")]
    InvalidDate(String),

    #[error("{0}")]
    EmailUnavailable(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// The request left the Pending state before this resolution
    #[error("The specified request has already been resolved")]
    AlreadyResolved,

    /// Missing, malformed or expired credentials
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    /// Access token could not be issued
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl ErsError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ErsError::InvalidAmount(_)
            | ErsError::InvalidName(_)
            | ErsError::WeakPassword(_)
            | ErsError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            ErsError::EmailUnavailable(_) | ErsError::AlreadyResolved => StatusCode::CONFLICT,
            ErsError::NotFound(_) => StatusCode::NOT_FOUND,
            ErsError::Forbidden(_) => StatusCode::FORBIDDEN,
            ErsError::Unauthorized => StatusCode::UNAUTHORIZED,
            ErsError::Persistence(_) | ErsError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            ErsError::Persistence(cause) => {
                error!("Persistence failure: {}", cause);
                "Internal server error".to_string()
            }
            ErsError::Token(cause) => {
                error!("Token failure: {}", cause);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for lifecycle results
pub type ErsResult<T> = Result<T, ErsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ErsError::InvalidAmount("Invalid amount".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErsError::EmailUnavailable("taken".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErsError::AlreadyResolved.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErsError::Forbidden("managers only".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErsError::Persistence(DatabaseError::NoIdentity("requests")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_token_failure_is_internal() {
        let cause = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidRsaKey("bad key".to_string()),
        );
        let err = ErsError::from(cause);

        assert!(matches!(err, ErsError::Token(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_is_the_rule() {
        let err = ErsError::WeakPassword("Password must contain at least one digit".into());
        assert_eq!(err.to_string(), "Password must contain at least one digit");
    }
}
