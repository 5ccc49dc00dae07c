//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::entity::User;
use crate::domain::value_object::Email;
use crate::error::AccountResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a new user; a taken email is `AccountError::EmailTaken`
    async fn create(&self, user: &User) -> AccountResult<()>;

    async fn find_by_id(&self, id: &UserId) -> AccountResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AccountResult<Option<User>>;

    async fn exists_by_email(&self, email: &Email) -> AccountResult<bool>;

    /// Persist name, email, password hash, role and status
    async fn update(&self, user: &User) -> AccountResult<()>;

    /// Oldest first
    async fn list(&self, skip: i64, limit: i64) -> AccountResult<Vec<User>>;

    /// Stamp `last_login_at` and return the updated user
    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> AccountResult<Option<User>>;
}
