//! Refresh Use Case
//!
//! Rotates a refresh token. Accounts deactivated since login lose their
//! session family here.

use std::sync::Arc;

use admission::{AdmissionPipeline, AuthError, TokenPair};
use platform::kv::KeyValueStore;

use crate::domain::repository::UserRepository;
use crate::error::AccountResult;

pub struct RefreshUseCase<R, S>
where
    R: UserRepository,
{
    repo: Arc<R>,
    pipeline: Arc<AdmissionPipeline<S>>,
}

impl<R, S> RefreshUseCase<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, pipeline: Arc<AdmissionPipeline<S>>) -> Self {
        Self { repo, pipeline }
    }

    pub async fn execute(&self, refresh_token: &str) -> AccountResult<TokenPair> {
        let tokens = self.pipeline.tokens();
        let pair = tokens.rotate(refresh_token).await?;

        let active = self
            .repo
            .find_by_id(&pair.principal.id)
            .await?
            .is_some_and(|user| user.can_login());
        if !active {
            if let Err(e) = tokens.revoke(&pair.refresh_token).await {
                tracing::warn!(error = %e, "Could not end family of inactive account");
            }
            return Err(AuthError::AccountInactive.into());
        }

        Ok(pair)
    }
}
