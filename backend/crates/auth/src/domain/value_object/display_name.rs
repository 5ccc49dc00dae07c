//! Display Name Value Object
//!
//! The name shown for an account. Not unique and never used to log in.
//!
//! ## Invariants
//! - NFKC-normalized, surrounding whitespace trimmed
//! - 2..=100 characters after normalization
//! - No control characters

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AccountError, AccountResult};

pub const DISPLAY_NAME_MIN_LENGTH: usize = 2;
pub const DISPLAY_NAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(raw: &str) -> AccountResult<Self> {
        let normalized: String = raw.nfkc().collect();
        let name = normalized.trim();

        let len = name.chars().count();
        if len < DISPLAY_NAME_MIN_LENGTH {
            return Err(AccountError::InvalidName(format!(
                "Name must be at least {DISPLAY_NAME_MIN_LENGTH} characters"
            )));
        }
        if len > DISPLAY_NAME_MAX_LENGTH {
            return Err(AccountError::InvalidName(format!(
                "Name must be at most {DISPLAY_NAME_MAX_LENGTH} characters"
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(AccountError::InvalidName(
                "Name contains control characters".to_string(),
            ));
        }

        Ok(Self(name.to_string()))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_normalizes() {
        let name = DisplayName::new("  Ａda Lovelace ").unwrap();
        assert_eq!(name.as_str(), "Ada Lovelace");
    }

    #[test]
    fn test_length_bounds() {
        assert!(DisplayName::new("A").is_err());
        assert!(DisplayName::new("   A   ").is_err());
        assert!(DisplayName::new("Al").is_ok());
        assert!(DisplayName::new(&"x".repeat(100)).is_ok());
        assert!(DisplayName::new(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(matches!(
            DisplayName::new("Ada\u{0007}Lovelace"),
            Err(AccountError::InvalidName(_))
        ));
    }
}
