//! Credential contract
//!
//! The admission layer never reads the user table itself. Whatever owns
//! accounts implements [`CredentialStore`]; password hashing is its concern.

use kernel::id::UserId;
use thiserror::Error;

use super::principal::Role;

/// What the credential store knows about an account
#[derive(Debug, Clone)]
pub struct PrincipalRecord {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    /// Opaque to this crate
    pub password_hash: String,
}

#[derive(Debug, Error)]
#[error("credential lookup failed: {0}")]
pub struct CredentialLookupError(pub String);

impl CredentialLookupError {
    pub fn new(err: impl std::fmt::Display) -> Self {
        Self(err.to_string())
    }
}

#[trait_variant::make(CredentialStore: Send)]
pub trait LocalCredentialStore {
    /// Look up an account by its login email
    async fn find_principal_by_credential(
        &self,
        email: &str,
    ) -> Result<Option<PrincipalRecord>, CredentialLookupError>;

    /// Opaque password check
    fn verify_password(&self, record: &PrincipalRecord, plaintext: &str) -> bool;
}
