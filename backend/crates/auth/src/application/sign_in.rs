//! Sign In Use Case
//!
//! Authenticates email + password, opens a new session family and warms
//! the session cache with the caller's profile.

use std::sync::Arc;

use admission::{AdmissionPipeline, Authenticator, TokenPair};
use chrono::Utc;
use platform::kv::KeyValueStore;

use crate::application::credentials::AccountCredentials;
use crate::application::passwords::Passwords;
use crate::application::profile::Profile;
use crate::domain::repository::UserRepository;
use crate::error::AccountResult;

pub struct SignInInput {
    pub email: String,
    pub password: String,
}

pub struct SignInUseCase<R, S>
where
    R: UserRepository,
{
    repo: Arc<R>,
    authenticator: Authenticator<AccountCredentials<R>>,
    pipeline: Arc<AdmissionPipeline<S>>,
}

impl<R, S> SignInUseCase<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, passwords: Arc<Passwords>, pipeline: Arc<AdmissionPipeline<S>>) -> Self {
        let credentials = AccountCredentials::new(repo.clone(), passwords);
        Self {
            repo,
            authenticator: Authenticator::new(Arc::new(credentials)),
            pipeline,
        }
    }

    pub async fn execute(&self, input: SignInInput) -> AccountResult<TokenPair> {
        let principal = self
            .authenticator
            .authenticate(&input.email, &input.password)
            .await?;

        let pair = self.pipeline.tokens().issue(&principal).await?;

        let cache = self.pipeline.cache();
        let session_key = cache.session_key(&principal.id).await;
        let user = self.repo.record_login(&principal.id, Utc::now()).await?;
        if let (Some(user), Some(key)) = (user, session_key) {
            cache
                .set_json(&key, &Profile::from(&user), cache.session_ttl())
                .await;
        }

        tracing::info!(user_id = %principal.id, role = %principal.role, "User signed in");
        Ok(pair)
    }
}
