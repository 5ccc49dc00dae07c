//! Route descriptions consumed by the admission pipeline

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use derive_more::Display;
use kernel::id::UserId;

/// Rate-limit tier a route belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RouteClass {
    #[display("login")]
    Login,
    #[display("register")]
    Register,
    #[display("refresh")]
    Refresh,
    #[display("general")]
    General,
}

/// Who may call a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessLevel {
    /// No token required; a presented token is still verified
    #[default]
    Anonymous,
    Authenticated,
    Admin,
}

/// Response caching for a read route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Key prefix, e.g. `products`
    pub resource: String,
    /// Falls back to the configured listing TTL
    pub ttl: Option<Duration>,
}

/// Everything the pipeline needs to know about one route.
///
/// ```rust
/// use admission::{AccessLevel, RouteClass, RouteSpec};
///
/// let create = RouteSpec::new(RouteClass::General)
///     .access(AccessLevel::Admin)
///     .invalidates("products");
/// assert!(create.cache.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub class: RouteClass,
    pub access: AccessLevel,
    pub cache: Option<CachePolicy>,
    /// Resource prefixes dropped from the cache after a successful write
    pub invalidates: Vec<String>,
}

impl RouteSpec {
    pub fn new(class: RouteClass) -> Self {
        Self {
            class,
            access: AccessLevel::Anonymous,
            cache: None,
            invalidates: Vec::new(),
        }
    }

    pub fn access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    pub fn cached(mut self, resource: impl Into<String>) -> Self {
        self.cache = Some(CachePolicy {
            resource: resource.into(),
            ttl: None,
        });
        self
    }

    pub fn cached_for(mut self, resource: impl Into<String>, ttl: Duration) -> Self {
        self.cache = Some(CachePolicy {
            resource: resource.into(),
            ttl: Some(ttl),
        });
        self
    }

    pub fn invalidates(mut self, resource: impl Into<String>) -> Self {
        self.invalidates.push(resource.into());
        self
    }
}

/// Whom a rate-limit bucket belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    User(UserId),
    Client(IpAddr),
    /// No token and no resolvable address
    Unknown,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(id) => write!(f, "user:{id}"),
            Identity::Client(ip) => write!(f, "ip:{ip}"),
            Identity::Unknown => f.write_str("ip:unknown"),
        }
    }
}
