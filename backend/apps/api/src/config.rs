//! Server Configuration
//!
//! Read once at startup from the environment (`.env` is loaded first by
//! `main`) and handed to each constructor. Environment differences become
//! explicit [`FeatureFlags`].

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use admission::{AdmissionConfig, CacheConfig, RateLimitTiers, TokenConfig};
use anyhow::{Context, bail};
use auth::AccountConfig;
use catalog::CatalogConfig;
use platform::kv::RedisStoreConfig;
use platform::rate_limit::RateLimitPolicy;
use sqlx::postgres::PgConnectOptions;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            "testing" | "test" => Ok(AppEnv::Testing),
            other => bail!("APP_ENV must be development, production or testing (got {other:?})"),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Testing => "testing",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub debug: bool,
    pub cache_enabled: bool,
    pub password_breach_check: bool,
    pub run_migrations: bool,
}

/// Everything the server is built from
pub struct ApiConfig {
    pub env: AppEnv,
    pub flags: FeatureFlags,
    pub bind_addr: SocketAddr,
    pub database: PgConnectOptions,
    pub db_max_connections: u32,
    pub redis: RedisStoreConfig,
    pub admission: AdmissionConfig,
    pub account: AccountConfig,
    pub catalog: CatalogConfig,
    pub frontend_origins: Vec<String>,
    /// No `SECRET_KEY`; tokens do not survive a restart
    pub ephemeral_secret: bool,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let env = match vars.get("APP_ENV") {
            Some(raw) => raw.parse()?,
            None => AppEnv::Development,
        };
        let production = env == AppEnv::Production;

        let flags = FeatureFlags {
            debug: vars.flag("DEBUG", !production)?,
            cache_enabled: vars.flag("CACHE_ENABLED", true)?,
            password_breach_check: vars.flag("PASSWORD_BREACH_CHECK", production)?,
            run_migrations: vars.flag("RUN_MIGRATIONS", env != AppEnv::Production)?,
        };

        let token = match vars.get("SECRET_KEY") {
            Some(secret) => TokenConfig {
                secret: secret.into_bytes(),
                ..Default::default()
            },
            None if production => bail!("SECRET_KEY must be set in production"),
            None => TokenConfig::with_random_secret(),
        };
        let ephemeral_secret = vars.get("SECRET_KEY").is_none();
        let token = TokenConfig {
            issuer: vars.get("TOKEN_ISSUER").unwrap_or(token.issuer),
            access_ttl: Duration::from_secs(60 * vars.parse("ACCESS_TOKEN_EXPIRE_MINUTES", 30u64)?),
            refresh_ttl: Duration::from_secs(
                24 * 3600 * vars.parse("REFRESH_TOKEN_EXPIRE_DAYS", 7u64)?,
            ),
            ..token
        };

        let general_limit = vars.parse("RATE_LIMIT_REQUESTS", 100u32)?;
        let general_window = vars.parse("RATE_LIMIT_WINDOW", 60u64)?;
        if general_limit == 0 || general_window == 0 {
            bail!("RATE_LIMIT_REQUESTS and RATE_LIMIT_WINDOW must be positive");
        }

        let admission = AdmissionConfig {
            token,
            rate_limits: RateLimitTiers {
                general: RateLimitPolicy::new(general_limit, general_window),
                ..Default::default()
            },
            cache: CacheConfig {
                enabled: flags.cache_enabled,
                listing_ttl: Duration::from_secs(vars.parse("CACHE_LISTING_TTL_SECS", 600u64)?),
                session_ttl: Duration::from_secs(vars.parse("CACHE_SESSION_TTL_SECS", 1800u64)?),
                ..Default::default()
            },
        };

        let account = AccountConfig {
            password_pepper: vars.get("PASSWORD_PEPPER").map(String::into_bytes),
            breach_check: flags.password_breach_check,
            ..Default::default()
        };

        let redis = RedisStoreConfig {
            url: vars
                .get("REDIS_URL")
                .unwrap_or_else(|| RedisStoreConfig::default().url),
            pool_size: vars.parse("REDIS_POOL_SIZE", 16usize)?,
            timeout: Duration::from_millis(vars.parse("REDIS_TIMEOUT_MS", 500u64)?),
        };

        let frontend_origins = vars
            .get("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            env,
            flags,
            bind_addr: vars.parse("BIND_ADDR", DEFAULT_BIND_ADDR.parse()?)?,
            database: database_options(&vars)?,
            db_max_connections: vars.parse("DB_MAX_CONNECTIONS", 5u32)?,
            redis,
            admission,
            account,
            catalog: CatalogConfig::default(),
            frontend_origins,
            ephemeral_secret,
        })
    }
}

/// `DATABASE_URL` wins; otherwise assemble from `POSTGRES_*`
fn database_options<F>(vars: &Vars<'_, F>) -> anyhow::Result<PgConnectOptions>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = vars.get("DATABASE_URL") {
        return PgConnectOptions::from_str(&url).context("DATABASE_URL is not a valid Postgres URL");
    }

    let Some(server) = vars.get("POSTGRES_SERVER") else {
        bail!("DATABASE_URL or POSTGRES_SERVER must be set");
    };
    let mut options = PgConnectOptions::new()
        .host(&server)
        .port(vars.parse("POSTGRES_PORT", 5432u16)?);
    if let Some(user) = vars.get("POSTGRES_USER") {
        options = options.username(&user);
    }
    if let Some(password) = vars.get("POSTGRES_PASSWORD") {
        options = options.password(&password);
    }
    if let Some(db) = vars.get("POSTGRES_DB") {
        options = options.database(&db);
    }
    Ok(options)
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank are the same
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, name: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(name) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{name} has an invalid value: {raw:?}")),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str, default: bool) -> anyhow::Result<bool> {
        match self.get(name).map(|v| v.to_ascii_lowercase()).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off") => Ok(false),
            Some(other) => bail!("{name} must be a boolean (got {other:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<ApiConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgres://app:pw@localhost:5432/shop");

    #[test]
    fn test_development_defaults() {
        let cfg = config(&[DB]).unwrap();
        assert_eq!(cfg.env, AppEnv::Development);
        assert!(cfg.flags.debug);
        assert!(cfg.flags.run_migrations);
        assert!(!cfg.flags.password_breach_check);
        assert!(cfg.ephemeral_secret);
        assert!(cfg.admission.token.validate().is_ok());
        assert_eq!(cfg.admission.token.access_ttl, Duration::from_secs(30 * 60));
        assert_eq!(cfg.admission.rate_limits.general, RateLimitPolicy::new(100, 60));
        assert_eq!(cfg.admission.rate_limits.login, RateLimitPolicy::new(5, 300));
        assert_eq!(cfg.admission.cache.listing_ttl, Duration::from_secs(600));
        assert_eq!(cfg.frontend_origins.len(), 2);
    }

    #[test]
    fn test_production_requires_secret() {
        let err = config(&[DB, ("APP_ENV", "production")]).err().unwrap();
        assert!(err.to_string().contains("SECRET_KEY"));

        let cfg = config(&[
            DB,
            ("APP_ENV", "production"),
            ("SECRET_KEY", "a-production-secret-that-is-long-enough"),
        ])
        .unwrap();
        assert!(!cfg.ephemeral_secret);
        assert!(!cfg.flags.debug);
        assert!(!cfg.flags.run_migrations);
        assert!(cfg.flags.password_breach_check);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            DB,
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("RATE_LIMIT_REQUESTS", "20"),
            ("RATE_LIMIT_WINDOW", "10"),
            ("CACHE_ENABLED", "off"),
            ("FRONTEND_ORIGINS", "https://shop.example, "),
        ])
        .unwrap();
        assert_eq!(cfg.admission.token.access_ttl, Duration::from_secs(300));
        assert_eq!(cfg.admission.rate_limits.general, RateLimitPolicy::new(20, 10));
        assert!(!cfg.admission.cache.enabled);
        assert_eq!(cfg.frontend_origins, ["https://shop.example"]);
    }

    #[test]
    fn test_postgres_parts() {
        let cfg = config(&[
            ("POSTGRES_SERVER", "db"),
            ("POSTGRES_PORT", "5433"),
            ("POSTGRES_USER", "app"),
            ("POSTGRES_DB", "shop"),
        ])
        .unwrap();
        assert_eq!(cfg.database.get_host(), "db");
        assert_eq!(cfg.database.get_port(), 5433);
        assert_eq!(cfg.database.get_username(), "app");
        assert_eq!(cfg.database.get_database(), Some("shop"));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = config(&[DB, ("RATE_LIMIT_REQUESTS", "many")]).err().unwrap();
        assert!(err.to_string().contains("RATE_LIMIT_REQUESTS"));

        let err = config(&[DB, ("CACHE_ENABLED", "maybe")]).err().unwrap();
        assert!(err.to_string().contains("CACHE_ENABLED"));

        assert!(config(&[DB, ("APP_ENV", "staging")]).is_err());
        assert!(config(&[]).is_err());
    }
}
