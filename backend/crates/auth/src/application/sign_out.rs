//! Sign Out Use Case
//!
//! Ends the session family of a refresh token and drops the cached session.

use std::sync::Arc;

use admission::AdmissionPipeline;
use platform::kv::KeyValueStore;

use crate::error::AccountResult;

pub struct SignOutUseCase<S> {
    pipeline: Arc<AdmissionPipeline<S>>,
}

impl<S> SignOutUseCase<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    pub fn new(pipeline: Arc<AdmissionPipeline<S>>) -> Self {
        Self { pipeline }
    }

    pub async fn execute(&self, refresh_token: &str) -> AccountResult<()> {
        let principal = self.pipeline.tokens().revoke(refresh_token).await?;
        self.pipeline.cache().invalidate_session(&principal.id).await;

        tracing::info!(user_id = %principal.id, "User signed out");
        Ok(())
    }
}
