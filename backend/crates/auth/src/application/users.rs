//! User Administration Use Case

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::config::AccountConfig;
use crate::application::profile::Profile;
use crate::domain::repository::UserRepository;
use crate::error::{AccountError, AccountResult};

pub struct UsersUseCase<R>
where
    R: UserRepository,
{
    repo: Arc<R>,
    config: Arc<AccountConfig>,
}

impl<R> UsersUseCase<R>
where
    R: UserRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AccountConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn list(&self, skip: Option<i64>, limit: Option<i64>) -> AccountResult<Vec<Profile>> {
        let (skip, limit) = self.config.page(skip, limit);
        let users = self.repo.list(skip, limit).await?;
        Ok(users.iter().map(Profile::from).collect())
    }

    pub async fn get(&self, id: &UserId) -> AccountResult<Profile> {
        self.repo
            .find_by_id(id)
            .await?
            .map(|user| Profile::from(&user))
            .ok_or(AccountError::UserNotFound)
    }
}
