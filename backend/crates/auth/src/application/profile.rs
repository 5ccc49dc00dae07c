//! Profile Use Case
//!
//! The signed-in user's own account: read (through the session cache),
//! update name/email, change password.

use std::sync::Arc;

use admission::{AdmissionPipeline, Role};
use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::kv::KeyValueStore;
use serde::{Deserialize, Serialize};

use crate::application::passwords::Passwords;
use crate::domain::entity::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{DisplayName, Email};
use crate::error::{AccountError, AccountResult};

/// Account as shown to its owner and to admins; also the cached session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.to_string(),
            email: user.email.to_string(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub struct ProfileUseCase<R, S>
where
    R: UserRepository,
{
    repo: Arc<R>,
    passwords: Arc<Passwords>,
    pipeline: Arc<AdmissionPipeline<S>>,
}

impl<R, S> ProfileUseCase<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, passwords: Arc<Passwords>, pipeline: Arc<AdmissionPipeline<S>>) -> Self {
        Self {
            repo,
            passwords,
            pipeline,
        }
    }

    /// Read-through the session cache
    pub async fn me(&self, id: &UserId) -> AccountResult<Profile> {
        let cache = self.pipeline.cache();
        let key = cache.session_key(id).await;
        if let Some(key) = key.as_deref()
            && let Some(profile) = cache.get_json::<Profile>(key).await
        {
            return Ok(profile);
        }

        let profile = Profile::from(&self.load(id).await?);
        if let Some(key) = key {
            cache.set_json(&key, &profile, cache.session_ttl()).await;
        }
        Ok(profile)
    }

    pub async fn update(&self, id: &UserId, input: UpdateProfileInput) -> AccountResult<Profile> {
        let mut user = self.load(id).await?;

        if let Some(name) = input.name {
            user.rename(DisplayName::new(&name)?);
        }
        if let Some(email) = input.email {
            let email = Email::new(&email)?;
            if email != user.email {
                if self.repo.exists_by_email(&email).await? {
                    return Err(AccountError::EmailTaken);
                }
                user.change_email(email);
            }
        }

        self.repo.update(&user).await?;
        self.pipeline.cache().invalidate_session(id).await;

        tracing::info!(user_id = %id, "Profile updated");
        Ok(Profile::from(&user))
    }

    /// End every session family of the user, then store the new password.
    ///
    /// Revocation needs the store; when it is down nothing is changed.
    pub async fn change_password(
        &self,
        id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> AccountResult<()> {
        let mut user = self.load(id).await?;
        if !self.passwords.verify(&user.password_hash, current_password) {
            return Err(AccountError::IncorrectPassword);
        }

        user.set_password(self.passwords.choose(new_password).await?);

        let families = self.pipeline.tokens().revoke_all(id).await?;
        self.repo.update(&user).await?;
        self.pipeline.cache().invalidate_session(id).await;

        tracing::info!(user_id = %id, families, "Password changed");
        Ok(())
    }

    async fn load(&self, id: &UserId) -> AccountResult<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }
}
