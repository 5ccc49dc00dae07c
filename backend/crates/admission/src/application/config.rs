//! Admission Configuration
//!
//! Built once at startup and handed to each component's constructor.

use std::fmt;
use std::time::Duration;

use platform::rate_limit::RateLimitPolicy;

use crate::domain::RouteClass;
use crate::error::TokenConfigError;

/// Minimum HS256 secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Secrets shipped in sample configuration files
const PLACEHOLDER_SECRETS: &[&str] = &[
    "your-secret-key-here-change-in-production",
    "your-secret-key-here",
    "change-me",
    "changeme",
    "secret",
    "super-secret-key",
];

/// Token signing and lifetime settings
#[derive(Clone)]
pub struct TokenConfig {
    /// HS256 signing secret
    pub secret: Vec<u8>,
    /// `iss` claim; tokens from another issuer are rejected
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: Vec::new(),
            issuer: "storefront".to_string(),
            access_ttl: Duration::from_secs(30 * 60),         // 30 minutes
            refresh_ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
        }
    }
}

impl TokenConfig {
    /// Config with a random secret (development and tests)
    pub fn with_random_secret() -> Self {
        Self {
            secret: platform::crypto::random_bytes(MIN_SECRET_LEN),
            ..Default::default()
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.as_secs() as i64
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.as_secs() as i64
    }

    /// Reject configurations under which no token could be trusted
    pub fn validate(&self) -> Result<(), TokenConfigError> {
        let trimmed = String::from_utf8_lossy(&self.secret).trim().to_ascii_lowercase();
        if PLACEHOLDER_SECRETS.contains(&trimmed.as_str()) {
            return Err(TokenConfigError::PlaceholderSecret);
        }
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(TokenConfigError::SecretTooShort {
                min: MIN_SECRET_LEN,
                actual: self.secret.len(),
            });
        }
        if self.secret.iter().all(|&b| b == self.secret[0]) {
            return Err(TokenConfigError::PlaceholderSecret);
        }
        if self.issuer.trim().is_empty() {
            return Err(TokenConfigError::EmptyIssuer);
        }
        if self.access_ttl_secs() <= 0 || self.access_ttl >= self.refresh_ttl {
            return Err(TokenConfigError::InvalidLifetimes);
        }
        Ok(())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Limit per route class
#[derive(Debug, Clone)]
pub struct RateLimitTiers {
    pub login: RateLimitPolicy,
    pub register: RateLimitPolicy,
    pub refresh: RateLimitPolicy,
    pub general: RateLimitPolicy,
}

impl Default for RateLimitTiers {
    fn default() -> Self {
        Self {
            login: RateLimitPolicy::new(5, 300),
            register: RateLimitPolicy::new(3, 3600),
            refresh: RateLimitPolicy::new(10, 300),
            general: RateLimitPolicy::new(100, 60),
        }
    }
}

impl RateLimitTiers {
    pub fn for_class(&self, class: RouteClass) -> RateLimitPolicy {
        match class {
            RouteClass::Login => self.login,
            RouteClass::Register => self.register,
            RouteClass::Refresh => self.refresh,
            RouteClass::General => self.general,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup misses and nothing is written
    pub enabled: bool,
    pub listing_ttl: Duration,
    pub session_ttl: Duration,
    /// Larger response bodies are passed through uncached
    pub max_entry_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listing_ttl: Duration::from_secs(10 * 60),
            session_ttl: Duration::from_secs(30 * 60),
            max_entry_bytes: 1024 * 1024,
        }
    }
}

/// Everything the admission pipeline is built from
#[derive(Debug, Clone, Default)]
pub struct AdmissionConfig {
    pub token: TokenConfig,
    pub rate_limits: RateLimitTiers,
    pub cache: CacheConfig,
}

impl AdmissionConfig {
    /// Random signing secret, default tiers and TTLs
    pub fn development() -> Self {
        Self {
            token: TokenConfig::with_random_secret(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_secret_validates() {
        assert!(TokenConfig::with_random_secret().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = TokenConfig {
            secret: b"short-but-random".to_vec(),
            ..TokenConfig::with_random_secret()
        };
        assert_eq!(
            config.validate(),
            Err(TokenConfigError::SecretTooShort { min: 32, actual: 16 })
        );
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let config = TokenConfig {
            secret: b"your-secret-key-here-change-in-production".to_vec(),
            ..TokenConfig::with_random_secret()
        };
        assert_eq!(config.validate(), Err(TokenConfigError::PlaceholderSecret));

        let config = TokenConfig {
            secret: vec![0u8; 64],
            ..TokenConfig::with_random_secret()
        };
        assert_eq!(config.validate(), Err(TokenConfigError::PlaceholderSecret));
    }

    #[test]
    fn test_lifetimes_must_be_ordered() {
        let config = TokenConfig {
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(60),
            ..TokenConfig::with_random_secret()
        };
        assert_eq!(config.validate(), Err(TokenConfigError::InvalidLifetimes));
    }

    #[test]
    fn test_default_tiers() {
        let tiers = RateLimitTiers::default();
        assert_eq!(tiers.for_class(RouteClass::Login), RateLimitPolicy::new(5, 300));
        assert_eq!(tiers.for_class(RouteClass::Register).limit, 3);
        assert_eq!(tiers.for_class(RouteClass::General).window, Duration::from_secs(60));
    }
}
