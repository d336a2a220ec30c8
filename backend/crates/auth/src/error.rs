//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordInputError;
use platform::rate_limit::RateLimitError;
use thiserror::Error;

use crate::application::csrf::CsrfError;
use crate::domain::value_object::email::EmailError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

const AUTH_REQUIRED: &str = "Authentication required";

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request body or field failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Identity provider rejected the email/password pair
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// JWT or session cookie absent
    #[error("Missing JWT or session")]
    MissingCredentials,

    #[error("Invalid or expired JWT")]
    InvalidToken,

    #[error("Invalid or expired session")]
    InvalidSession,

    /// JWT and session belong to different users
    #[error("JWT and session user mismatch")]
    CredentialMismatch,

    /// Refresh without a live session
    #[error("No active session")]
    NoActiveSession,

    /// Authenticated account has no profile
    #[error("User profile not found")]
    ProfileNotFound,

    #[error("CSRF validation failed: {0}")]
    CsrfViolation(String),

    #[error("Rate limited for {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Identity provider timed out or failed
    #[error("Identity provider unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidSession
            | AuthError::CredentialMismatch
            | AuthError::NoActiveSession => StatusCode::UNAUTHORIZED,
            AuthError::ProfileNotFound | AuthError::CsrfViolation(_) => StatusCode::FORBIDDEN,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::IdentityUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidInput(_) => ErrorKind::BadRequest,
            AuthError::InvalidCredentials
            | AuthError::MissingCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidSession
            | AuthError::CredentialMismatch
            | AuthError::NoActiveSession => ErrorKind::Unauthorized,
            AuthError::ProfileNotFound | AuthError::CsrfViolation(_) => ErrorKind::Forbidden,
            AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::IdentityUnavailable(_) => ErrorKind::ServiceUnavailable,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Message safe to show to clients.
    ///
    /// Session and token failures collapse into one message so a caller
    /// cannot tell which half of the credential pair was wrong.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::InvalidInput(msg) => msg.clone(),
            AuthError::InvalidCredentials => "Invalid email or password".to_string(),
            AuthError::MissingCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidSession
            | AuthError::CredentialMismatch
            | AuthError::NoActiveSession => AUTH_REQUIRED.to_string(),
            AuthError::ProfileNotFound => "User profile not found".to_string(),
            AuthError::CsrfViolation(_) => "CSRF validation failed".to_string(),
            AuthError::RateLimited { .. } => "Too many attempts".to_string(),
            AuthError::IdentityUnavailable(_) => "Authentication service unavailable".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.client_message());
        match self {
            AuthError::RateLimited { retry_after_secs } => err.with_retry_after(*retry_after_secs),
            _ => err,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::IdentityUnavailable(msg) => {
                tracing::error!(message = %msg, "Identity provider unavailable");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::CredentialMismatch => {
                tracing::warn!("JWT and session user mismatch detected");
            }
            AuthError::CsrfViolation(reason) => {
                tracing::warn!(reason = %reason, "CSRF validation failed");
            }
            AuthError::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Login rate limited");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<CsrfError> for AuthError {
    fn from(err: CsrfError) -> Self {
        AuthError::CsrfViolation(err.to_string())
    }
}

impl From<RateLimitError> for AuthError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Limited { retry_after_secs } => {
                AuthError::RateLimited { retry_after_secs }
            }
            RateLimitError::Backend(msg) => AuthError::Internal(format!("rate limit store: {msg}")),
        }
    }
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

impl From<PasswordInputError> for AuthError {
    fn from(err: PasswordInputError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::InvalidInput("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::ProfileNotFound.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::CsrfViolation("missing".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::RateLimited { retry_after_secs: 5 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::IdentityUnavailable("timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_status_matches_kind() {
        let all = [
            AuthError::InvalidInput("x".into()),
            AuthError::InvalidCredentials,
            AuthError::MissingCredentials,
            AuthError::InvalidToken,
            AuthError::InvalidSession,
            AuthError::CredentialMismatch,
            AuthError::NoActiveSession,
            AuthError::ProfileNotFound,
            AuthError::CsrfViolation("x".into()),
            AuthError::RateLimited { retry_after_secs: 1 },
            AuthError::IdentityUnavailable("x".into()),
            AuthError::Internal("x".into()),
        ];
        for err in all {
            assert_eq!(err.status_code().as_u16(), err.kind().status_code());
        }
    }

    #[test]
    fn test_session_failures_share_client_message() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidToken,
            AuthError::InvalidSession,
            AuthError::CredentialMismatch,
            AuthError::NoActiveSession,
        ] {
            assert_eq!(err.client_message(), AUTH_REQUIRED);
        }
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AuthError::Internal("dashmap poisoned at shard 3".into());
        assert!(!err.to_app_error().message().contains("shard"));
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let err: AuthError = RateLimitError::Limited {
            retry_after_secs: 1800,
        }
        .into();
        assert_eq!(err.to_app_error().retry_after(), Some(1800));
    }
}
