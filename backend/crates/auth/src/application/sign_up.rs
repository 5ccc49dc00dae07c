//! Sign Up Use Case
//!
//! Creates a new account. Registration always yields the `user` role.

use std::sync::Arc;

use crate::application::passwords::Passwords;
use crate::domain::entity::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{DisplayName, Email};
use crate::error::{AccountError, AccountResult};

pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub struct SignUpUseCase<R>
where
    R: UserRepository,
{
    repo: Arc<R>,
    passwords: Arc<Passwords>,
}

impl<R> SignUpUseCase<R>
where
    R: UserRepository,
{
    pub fn new(repo: Arc<R>, passwords: Arc<Passwords>) -> Self {
        Self { repo, passwords }
    }

    pub async fn execute(&self, input: SignUpInput) -> AccountResult<User> {
        let name = DisplayName::new(&input.name)?;
        let email = Email::new(&input.email)?;

        if self.repo.exists_by_email(&email).await? {
            return Err(AccountError::EmailTaken);
        }

        let password_hash = self.passwords.choose(&input.password).await?;
        let user = User::new(name, email, password_hash);

        // The unique index still decides a race between two sign-ups
        self.repo.create(&user).await?;

        tracing::info!(user_id = %user.id, email_domain = %user.email.domain(), "User signed up");
        Ok(user)
    }
}
