//! Admission Error Types
//!
//! Rejections produced by the admission pipeline. Each maps onto the
//! unified `kernel::error::AppError` envelope at the HTTP boundary.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::kv::StoreError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication failures.
///
/// Token failures are terminal for the request and never retried.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token has expired")]
    Expired,

    #[error("Token signature is invalid")]
    BadSignature,

    /// The refresh token was superseded by a rotation or revoked
    #[error("Refresh token is no longer valid")]
    StaleToken,

    #[error("Token is malformed")]
    Malformed,

    #[error("Authentication required")]
    MissingCredentials,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    /// Rotation markers could not be read or written
    #[error("Authentication store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Expired
            | AuthError::BadSignature
            | AuthError::StaleToken
            | AuthError::Malformed
            | AuthError::MissingCredentials
            | AuthError::InvalidCredentials => ErrorKind::Unauthorized,
            AuthError::Forbidden | AuthError::AccountInactive => ErrorKind::Forbidden,
            AuthError::StoreUnavailable(_) => ErrorKind::ServiceUnavailable,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::BadSignature | AuthError::Malformed => "INVALID_TOKEN",
            AuthError::StaleToken => "TOKEN_REVOKED",
            AuthError::MissingCredentials => "AUTH_REQUIRED",
            AuthError::InvalidCredentials => "AUTH_FAILED",
            AuthError::Forbidden => "INSUFFICIENT_PERMISSIONS",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::StoreUnavailable(_) => "SERVICE_UNAVAILABLE",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_app_error(&self) -> AppError {
        let message = match self {
            // Do not leak store details to clients
            AuthError::StoreUnavailable(_) => "Authentication is temporarily unavailable".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let err = AppError::new(self.kind(), message).with_code(self.code());
        if self.kind() == ErrorKind::Unauthorized {
            err.with_challenge("Bearer")
        } else {
            err
        }
    }

    fn log(&self) {
        match self {
            AuthError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "Auth store unavailable");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::StaleToken => {
                tracing::warn!("Superseded refresh token presented");
            }
            AuthError::BadSignature => {
                tracing::warn!("Token with invalid signature presented");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
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

/// Request rejected by the rate limiter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rate limit exceeded; retry after {retry_after} seconds")]
pub struct RateLimitExceeded {
    /// Seconds until the current window closes (at least 1)
    pub retry_after: u64,
    pub limit: u32,
}

impl RateLimitExceeded {
    pub fn to_app_error(&self) -> AppError {
        AppError::too_many_requests("Too many requests. Please try again later.")
            .with_retry_after(self.retry_after)
            .with_details(serde_json::json!({
                "limit": self.limit,
                "retry_after": self.retry_after,
            }))
    }
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let mut response = self.to_app_error().into_response();
        let headers = response.headers_mut();
        headers.insert("x-ratelimit-limit", self.limit.into());
        headers.insert("x-ratelimit-remaining", 0u32.into());
        headers.insert("x-ratelimit-reset", self.retry_after.into());
        response
    }
}

/// Any rejection of the admission pipeline
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        match self {
            AdmissionError::Auth(e) => e.into_response(),
            AdmissionError::RateLimited(e) => e.into_response(),
        }
    }
}

/// Fatal token configuration problems detected at startup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenConfigError {
    #[error("signing secret must be at least {min} bytes (got {actual})")]
    SecretTooShort { min: usize, actual: usize },

    #[error("signing secret is a placeholder value")]
    PlaceholderSecret,

    #[error("access token lifetime must be positive and shorter than the refresh lifetime")]
    InvalidLifetimes,

    #[error("issuer must not be empty")]
    EmptyIssuer,

    #[error("signing self-check failed: {0}")]
    Probe(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_failures_are_unauthorized_with_challenge() {
        for err in [
            AuthError::Expired,
            AuthError::BadSignature,
            AuthError::StaleToken,
            AuthError::Malformed,
            AuthError::MissingCredentials,
        ] {
            let app = err.to_app_error();
            assert_eq!(app.status_code(), 401);
            assert_eq!(app.challenge(), Some("Bearer"));
        }
    }

    #[test]
    fn test_forbidden_has_no_challenge() {
        let app = AuthError::Forbidden.to_app_error();
        assert_eq!(app.status_code(), 403);
        assert!(app.challenge().is_none());
    }

    #[test]
    fn test_store_unavailable_hides_details() {
        let err = AuthError::StoreUnavailable(StoreError::Unavailable("10.0.0.3:6379".into()));
        let app = err.to_app_error();
        assert_eq!(app.status_code(), 503);
        assert!(!app.message().contains("6379"));
    }

    #[test]
    fn test_rate_limit_response_headers() {
        let response = RateLimitExceeded {
            retry_after: 42,
            limit: 5,
        }
        .into_response();
        assert_eq!(response.status(), 429);
        assert_eq!(response.headers()["retry-after"], "42");
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    }
}
