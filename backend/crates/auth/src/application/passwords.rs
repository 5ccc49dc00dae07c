//! Password Service
//!
//! Policy check, optional breach check and Argon2id hashing for newly
//! chosen passwords, plus verification for login and password change.

use platform::password::{
    BreachChecker, ClearTextPassword, HashedPassword, PasswordHashing, PasswordPolicy,
    PasswordPolicyError,
};

use crate::application::config::AccountConfig;
use crate::error::AccountResult;

pub struct Passwords {
    policy: PasswordPolicy,
    hashing: PasswordHashing,
    breach: Option<BreachChecker>,
}

impl Passwords {
    pub fn new(config: &AccountConfig) -> AccountResult<Self> {
        let breach = if config.breach_check {
            Some(BreachChecker::new(config.breach_check_timeout)?)
        } else {
            None
        };
        Ok(Self {
            policy: config.password_policy.clone(),
            hashing: PasswordHashing::new(config.hashing_cost, config.password_pepper.clone())?,
            breach,
        })
    }

    /// Validate and hash a password the user is choosing.
    ///
    /// An unreachable breach service does not block the change.
    pub async fn choose(&self, raw: &str) -> AccountResult<HashedPassword> {
        let password = ClearTextPassword::new(raw, &self.policy)?;

        if let Some(breach) = &self.breach {
            match breach.is_compromised(&password).await {
                Ok(true) => return Err(PasswordPolicyError::Compromised.into()),
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "Breach check skipped"),
            }
        }

        Ok(self.hashing.hash(&password)?)
    }

    pub fn verify(&self, hashed: &HashedPassword, raw: &str) -> bool {
        self.hashing
            .verify(hashed, &ClearTextPassword::unvalidated(raw))
    }

    /// Verify against a stored PHC string; unparsable hashes never match
    pub fn verify_phc(&self, phc: &str, raw: &str) -> bool {
        match HashedPassword::from_phc_string(phc) {
            Ok(hashed) => self.verify(&hashed, raw),
            Err(_) => {
                tracing::error!("Stored password hash is not a PHC string");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccountError;

    #[tokio::test]
    async fn test_choose_then_verify() {
        let passwords = Passwords::new(&AccountConfig::testing()).unwrap();
        let hashed = passwords.choose("lantern-orchid-42").await.unwrap();

        assert!(passwords.verify(&hashed, "lantern-orchid-42"));
        assert!(!passwords.verify(&hashed, "lantern-orchid-43"));
        assert!(passwords.verify_phc(hashed.as_phc_string(), "lantern-orchid-42"));
        assert!(!passwords.verify_phc("plaintext", "plaintext"));
    }

    #[tokio::test]
    async fn test_choose_enforces_policy() {
        let passwords = Passwords::new(&AccountConfig::testing()).unwrap();
        assert!(matches!(
            passwords.choose("short").await,
            Err(AccountError::PasswordPolicy(PasswordPolicyError::TooShort { .. }))
        ));
    }
}
