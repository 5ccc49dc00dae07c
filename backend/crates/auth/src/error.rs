//! Account Error Types
//!
//! Account-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Authentication and token failures are
//! carried through unchanged from the admission layer.

use admission::AuthError;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::{PasswordHashError, PasswordPolicyError};
use thiserror::Error;

pub type AccountResult<T> = Result<T, AccountError>;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("User not found")]
    UserNotFound,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("{0}")]
    InvalidEmail(String),

    #[error("{0}")]
    InvalidName(String),

    #[error(transparent)]
    PasswordPolicy(#[from] PasswordPolicyError),

    /// Wrong current password on a password change
    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::Auth(e) => e.kind(),
            AccountError::UserNotFound => ErrorKind::NotFound,
            AccountError::EmailTaken => ErrorKind::Conflict,
            AccountError::InvalidEmail(_)
            | AccountError::InvalidName(_)
            | AccountError::PasswordPolicy(_)
            | AccountError::IncorrectPassword => ErrorKind::BadRequest,
            AccountError::Database(_) | AccountError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            AccountError::Auth(e) => e.to_app_error(),
            AccountError::EmailTaken => AppError::conflict(self.to_string()).with_code("EMAIL_TAKEN"),
            AccountError::PasswordPolicy(_) => {
                AppError::bad_request(self.to_string()).with_code("WEAK_PASSWORD")
            }
            AccountError::IncorrectPassword => {
                AppError::bad_request(self.to_string()).with_code("INCORRECT_PASSWORD")
            }
            // Never leak database or internal details
            AccountError::Database(_) | AccountError::Internal(_) => {
                AppError::internal("An internal error occurred")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            AccountError::Database(e) => {
                tracing::error!(error = %e, "Account database error");
            }
            AccountError::Internal(msg) => {
                tracing::error!(message = %msg, "Account internal error");
            }
            AccountError::IncorrectPassword => {
                tracing::warn!("Password change with wrong current password");
            }
            _ => {
                tracing::debug!(error = %self, "Account error");
            }
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            // AuthError logs itself
            AccountError::Auth(e) => e.into_response(),
            other => {
                other.log();
                other.to_app_error().into_response()
            }
        }
    }
}

impl From<PasswordHashError> for AccountError {
    fn from(err: PasswordHashError) -> Self {
        AccountError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_keep_their_status() {
        assert_eq!(
            AccountError::from(AuthError::AccountInactive).to_app_error().status_code(),
            403
        );
        assert_eq!(
            AccountError::from(AuthError::InvalidCredentials)
                .to_app_error()
                .status_code(),
            401
        );
    }

    #[test]
    fn test_database_error_is_hidden() {
        let app = AccountError::Database(sqlx::Error::PoolClosed).to_app_error();
        assert_eq!(app.status_code(), 500);
        assert!(!app.message().contains("pool"));
    }

    #[test]
    fn test_conflict_code() {
        let app = AccountError::EmailTaken.to_app_error();
        assert_eq!(app.status_code(), 409);
        assert_eq!(app.code(), "EMAIL_TAKEN");
    }
}
