//! Rate Limiter
//!
//! One counter per `(route class, identity, window)`, created by the first
//! request of the window and expiring with it. Increment and read happen in
//! a single atomic store operation, so concurrent requests can never admit
//! more than the limit between them.
//!
//! If the store cannot be reached the limiter admits the request.

use std::sync::Arc;

use platform::clock::Clock;
use platform::kv::KeyValueStore;
use platform::rate_limit::RateLimitPolicy;

use crate::application::config::RateLimitTiers;
use crate::domain::{Identity, RouteClass};
use crate::error::RateLimitExceeded;

const NAMESPACE: &str = "rate_limit:";

/// Allowance left after an admitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
    /// False when the store was unreachable and nothing was counted
    pub metered: bool,
}

pub struct RateLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    tiers: RateLimitTiers,
}

impl<S> RateLimiter<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, tiers: RateLimitTiers) -> Self {
        Self {
            store,
            clock,
            tiers,
        }
    }

    pub fn policy(&self, class: RouteClass) -> RateLimitPolicy {
        self.tiers.for_class(class)
    }

    /// Count this request and decide whether it is admitted
    pub async fn check(
        &self,
        identity: &Identity,
        class: RouteClass,
    ) -> Result<Quota, RateLimitExceeded> {
        let policy = self.policy(class);
        let now_ms = self.clock.now_ms();
        let key = bucket_key(class, identity, policy.window_index(now_ms));
        let reset_after = policy.retry_after_secs(now_ms);

        let count = match self.store.incr_window(&key, policy.window).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    identity = %identity,
                    class = %class,
                    "Rate limit store unavailable; admitting request"
                );
                return Ok(Quota {
                    limit: policy.limit,
                    remaining: policy.limit,
                    reset_after,
                    metered: false,
                });
            }
        };

        if !policy.admits(count) {
            tracing::warn!(
                identity = %identity,
                class = %class,
                count,
                limit = policy.limit,
                "Rate limit exceeded"
            );
            return Err(RateLimitExceeded {
                retry_after: reset_after,
                limit: policy.limit,
            });
        }

        Ok(Quota {
            limit: policy.limit,
            remaining: policy.remaining(count),
            reset_after,
            metered: true,
        })
    }
}

fn bucket_key(class: RouteClass, identity: &Identity, window_index: i64) -> String {
    format!("{NAMESPACE}{class}:{identity}:{window_index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn test_bucket_key_layout() {
        let ip: IpAddr = "198.51.100.7".parse().unwrap();
        assert_eq!(
            bucket_key(RouteClass::Login, &Identity::Client(ip), 28_333_333),
            "rate_limit:login:ip:198.51.100.7:28333333"
        );
    }
}
