//! Credential check for login

use std::sync::Arc;

use crate::domain::{CredentialStore, Principal};
use crate::error::{AuthError, AuthResult};

pub struct Authenticator<C> {
    credentials: Arc<C>,
}

impl<C> Authenticator<C>
where
    C: CredentialStore + Send + Sync + 'static,
{
    pub fn new(credentials: Arc<C>) -> Self {
        Self { credentials }
    }

    /// Resolve email + password to a principal.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<Principal> {
        let email = email.trim().to_lowercase();
        let record = self
            .credentials
            .find_principal_by_credential(&email)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.credentials.verify_password(&record, password) {
            return Err(AuthError::InvalidCredentials);
        }
        if !record.is_active {
            return Err(AuthError::AccountInactive);
        }

        Ok(Principal::new(record.id, record.role))
    }
}
