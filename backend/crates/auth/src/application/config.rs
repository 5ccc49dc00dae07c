//! Application Configuration
//!
//! Configuration for the account application layer.

use std::time::Duration;

use platform::password::{HashingCost, PasswordPolicy};

#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Rules for newly chosen passwords
    pub password_policy: PasswordPolicy,
    /// Argon2id cost
    pub hashing_cost: HashingCost,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Reject passwords found in Have I Been Pwned
    pub breach_check: bool,
    pub breach_check_timeout: Duration,
    /// Page size when the caller gives none
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            password_policy: PasswordPolicy::default(),
            hashing_cost: HashingCost::default(),
            password_pepper: None,
            breach_check: false,
            breach_check_timeout: Duration::from_secs(3),
            default_page_size: 100,
            max_page_size: 100,
        }
    }
}

impl AccountConfig {
    /// Cheapest hashing parameters; tests only
    pub fn testing() -> Self {
        Self {
            hashing_cost: HashingCost::minimal(),
            ..Default::default()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Clamp caller-supplied pagination
    pub fn page(&self, skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
        let skip = skip.unwrap_or(0).max(0);
        let limit = limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        (skip, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        let config = AccountConfig::default();
        assert_eq!(config.page(None, None), (0, 100));
        assert_eq!(config.page(Some(-5), Some(0)), (0, 1));
        assert_eq!(config.page(Some(20), Some(1000)), (20, 100));
    }
}
