//! Auth (Account) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - User entity, value objects, repository trait
//! - `application/` - Use cases and the password service
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Registration and login with email + password
//! - Bearer access tokens with rotating refresh tokens (one family per login)
//! - Profile read-through the session cache, profile update, password change
//! - Admin-only user listing
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant), optional pepper
//! - Optional Have I Been Pwned check for new passwords
//! - Password change ends every session family of the account
//! - Token verification, rate limiting and caching happen in `admission`

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::AccountConfig;
pub use error::{AccountError, AccountResult};
pub use infra::postgres::PgUserRepository;
pub use presentation::router::{auth_router, auth_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
