//! Request Admission
//!
//! Decides, per request, whether it may reach a handler:
//! - `TokenEngine` - signed access/refresh tokens with refresh rotation
//! - `RateLimiter` - fixed-window counters per identity and route class
//! - `SessionCache` - namespaced response and session cache with prefix invalidation
//! - `AdmissionPipeline` - composes the three: authenticate, rate-limit, cache lookup
//!
//! Layout follows the other backend crates:
//! - `domain/` - principals, claims, route descriptions, credential contract
//! - `application/` - the engines above and their configuration
//! - `presentation/` - the axum middleware driving the pipeline
//!
//! All cross-request state lives in a shared [`platform::kv::KeyValueStore`];
//! nothing here holds an in-process lock across an await.

pub mod application;
pub mod domain;
pub mod error;
pub mod presentation;


pub use application::{
    Admission, AdmissionConfig, AdmissionPipeline, Authenticator, CacheConfig, CacheDecision,
    CacheLookup, Quota, RateLimitTiers, RateLimiter, RequestContext, SessionCache, TokenConfig,
    TokenEngine, TokenPair,
};
pub use domain::{
    AccessLevel, CredentialStore, Identity, Principal, PrincipalRecord, Role, RouteClass,
    RouteSpec,
};
pub use error::{AdmissionError, AuthError, RateLimitExceeded, TokenConfigError};
pub use presentation::{RouteGuard, admit, guarded};
