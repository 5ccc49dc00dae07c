//! Credential store over the user repository
//!
//! What the admission layer's `Authenticator` reads at login.

use std::sync::Arc;

use admission::domain::CredentialLookupError;
use admission::{CredentialStore, PrincipalRecord};

use crate::application::passwords::Passwords;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::Email;

pub struct AccountCredentials<R> {
    repo: Arc<R>,
    passwords: Arc<Passwords>,
}

impl<R> AccountCredentials<R> {
    pub fn new(repo: Arc<R>, passwords: Arc<Passwords>) -> Self {
        Self { repo, passwords }
    }
}

impl<R> CredentialStore for AccountCredentials<R>
where
    R: UserRepository + Send + Sync + 'static,
{
    async fn find_principal_by_credential(
        &self,
        email: &str,
    ) -> Result<Option<PrincipalRecord>, CredentialLookupError> {
        // A malformed email cannot belong to anyone
        let Ok(email) = Email::new(email) else {
            return Ok(None);
        };
        let user = self
            .repo
            .find_by_email(&email)
            .await
            .map_err(CredentialLookupError::new)?;
        Ok(user.map(|u| u.to_principal_record()))
    }

    fn verify_password(&self, record: &PrincipalRecord, plaintext: &str) -> bool {
        self.passwords.verify_phc(&record.password_hash, plaintext)
    }
}
