//! Admission Pipeline
//!
//! Per-request decision, terminal on the first rejection:
//!
//! ```text
//! Start -> TokenVerify (if a token is present) -> AccessCheck -> RateLimit
//!       -> CacheLookup (cacheable reads only) -> Admitted
//! ```
//!
//! Token verification needs no store round-trip, so malformed or expired
//! tokens are rejected before any counter is touched.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use platform::clock::Clock;
use platform::kv::KeyValueStore;

use crate::application::config::AdmissionConfig;
use crate::application::rate_limiter::{Quota, RateLimiter};
use crate::application::session_cache::{CacheLookup, SessionCache, listing_key};
use crate::application::token_engine::TokenEngine;
use crate::domain::{AccessLevel, Identity, Principal, RouteSpec};
use crate::error::{AdmissionError, AuthError, TokenConfigError};

/// What the pipeline needs from an inbound request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub bearer: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub path: String,
    pub query: Option<String>,
    /// GET / HEAD
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    /// Route is not cacheable, or caching is off
    Bypass,
    Hit(Vec<u8>),
    /// Populate `key` once the handler succeeds
    Miss { key: String, ttl: Duration },
}

/// An admitted request
#[derive(Debug, Clone)]
pub struct Admission {
    pub principal: Option<Principal>,
    pub identity: Identity,
    pub quota: Quota,
    pub cache: CacheDecision,
}

pub struct AdmissionPipeline<S> {
    tokens: TokenEngine<S>,
    limiter: RateLimiter<S>,
    cache: SessionCache<S>,
}

impl<S> AdmissionPipeline<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    /// Build all three components over one store.
    ///
    /// Fails when the token configuration is unusable.
    pub fn new(
        config: AdmissionConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenConfigError> {
        Ok(Self {
            tokens: TokenEngine::new(config.token, store.clone(), clock.clone())?,
            limiter: RateLimiter::new(store.clone(), clock, config.rate_limits),
            cache: SessionCache::new(store, config.cache),
        })
    }

    pub fn tokens(&self) -> &TokenEngine<S> {
        &self.tokens
    }

    pub fn limiter(&self) -> &RateLimiter<S> {
        &self.limiter
    }

    pub fn cache(&self) -> &SessionCache<S> {
        &self.cache
    }

    pub async fn admit(
        &self,
        spec: &RouteSpec,
        ctx: &RequestContext,
    ) -> Result<Admission, AdmissionError> {
        let principal = ctx
            .bearer
            .as_deref()
            .map(|token| self.tokens.verify_access(token))
            .transpose()?;

        match (spec.access, &principal) {
            (AccessLevel::Anonymous, _) => {}
            (_, None) => return Err(AuthError::MissingCredentials.into()),
            (AccessLevel::Admin, Some(p)) if !p.is_admin() => {
                tracing::warn!(user_id = %p.id, "Non-admin denied admin route");
                return Err(AuthError::Forbidden.into());
            }
            _ => {}
        }

        let identity = match (&principal, ctx.client_ip) {
            (Some(p), _) => Identity::User(p.id),
            (None, Some(ip)) => Identity::Client(ip),
            (None, None) => Identity::Unknown,
        };
        let quota = self.limiter.check(&identity, spec.class).await?;

        let cache = self.lookup(spec, ctx).await;

        Ok(Admission {
            principal,
            identity,
            quota,
            cache,
        })
    }

    async fn lookup(&self, spec: &RouteSpec, ctx: &RequestContext) -> CacheDecision {
        let Some(policy) = spec.cache.as_ref() else {
            return CacheDecision::Bypass;
        };
        if !ctx.is_read || !self.cache.config().enabled {
            return CacheDecision::Bypass;
        }

        // Unknown generation: serve uncached rather than risk a stale key
        let Some(generation) = self.cache.generation(&policy.resource).await else {
            return CacheDecision::Bypass;
        };
        let key = listing_key(
            &policy.resource,
            generation,
            &ctx.path,
            ctx.query.as_deref(),
        );
        match self.cache.get(&key).await {
            CacheLookup::Hit(body) => CacheDecision::Hit(body),
            CacheLookup::Miss => CacheDecision::Miss {
                key,
                ttl: policy.ttl.unwrap_or_else(|| self.cache.listing_ttl()),
            },
        }
    }

    /// Invalidate everything `spec` declares; call only after a successful write.
    ///
    /// Each resource's generation moves first, so a read still in flight from
    /// before the write populates a key that is never looked up again.
    pub async fn complete_write(&self, spec: &RouteSpec) -> u64 {
        let mut removed = 0;
        for resource in &spec.invalidates {
            removed += self.cache.invalidate_resource(resource).await;
        }
        removed
    }
}
