//! Application Layer
//!
//! The admission engines and their configuration.

pub mod authenticator;
pub mod config;
pub mod pipeline;
pub mod rate_limiter;
pub mod session_cache;
pub mod token_engine;

// Re-exports
pub use authenticator::Authenticator;
pub use config::{AdmissionConfig, CacheConfig, RateLimitTiers, TokenConfig};
pub use pipeline::{Admission, AdmissionPipeline, CacheDecision, RequestContext};
pub use rate_limiter::{Quota, RateLimiter};
pub use session_cache::{CacheLookup, SessionCache, listing_key, session_resource};
pub use token_engine::{TokenEngine, TokenPair};
