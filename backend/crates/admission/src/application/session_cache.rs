//! Session Cache
//!
//! Serialized listings and per-user session records under the `cache:`
//! namespace of the shared store. The cache is an optimization only: a
//! store failure is logged and treated as a miss, never surfaced.
//!
//! Listing keys embed the resource's generation. Invalidation bumps the
//! generation before deleting the prefix, so a read that started before a
//! write can only populate a key that no later lookup will ask for.

use std::sync::Arc;
use std::time::Duration;

use kernel::id::UserId;
use platform::kv::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::config::CacheConfig;

const NAMESPACE: &str = "cache:";

/// Generation counters must outlive every entry they version
const GENERATION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Vec<u8>),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

pub struct SessionCache<S> {
    store: Arc<S>,
    config: CacheConfig,
}

impl<S> SessionCache<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub async fn get(&self, key: &str) -> CacheLookup {
        if !self.config.enabled {
            return CacheLookup::Miss;
        }
        match self.store.get(&namespaced(key)).await {
            Ok(Some(value)) => {
                tracing::debug!(key = %key, "cache hit");
                CacheLookup::Hit(value)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
                CacheLookup::Miss
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache GET failed; treating as miss");
                CacheLookup::Miss
            }
        }
    }

    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        if !self.config.enabled {
            return;
        }
        if value.len() > self.config.max_entry_bytes {
            tracing::debug!(key = %key, size = value.len(), "Entry too large to cache");
            return;
        }
        let ttl = ttl.min(GENERATION_TTL);
        if let Err(e) = self.store.set(&namespaced(key), value, ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache SET failed");
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get(key).await {
            CacheLookup::Hit(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            CacheLookup::Miss => None,
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, &bytes, ttl).await,
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache value not serializable"),
        }
    }

    /// Drop cached entries.
    ///
    /// A trailing `*` makes `pattern` a prefix (`products:*`); otherwise it
    /// names a single key. Runs even when caching is disabled so entries
    /// written before a flag flip cannot go stale. Returns how many entries
    /// were removed.
    pub async fn invalidate(&self, pattern: &str) -> u64 {
        let result = match pattern.strip_suffix('*') {
            Some(prefix) => self.store.delete_prefix(&namespaced(prefix)).await,
            None => self
                .store
                .delete(&namespaced(pattern))
                .await
                .map(u64::from),
        };
        match result {
            Ok(removed) => {
                tracing::debug!(pattern = %pattern, removed, "Cache invalidated");
                removed
            }
            Err(e) => {
                // Entries still expire by TTL
                tracing::error!(pattern = %pattern, error = %e, "Cache invalidation failed");
                0
            }
        }
    }

    /// Drop everything cached for a resource type
    pub async fn invalidate_resource(&self, resource: &str) -> u64 {
        if let Err(e) = self
            .store
            .incr_window(&generation_key(resource), GENERATION_TTL)
            .await
        {
            tracing::error!(resource = %resource, error = %e, "Cache generation bump failed");
        }
        self.invalidate(&format!("{resource}:*")).await
    }

    /// Current generation of `resource`, `None` when the store cannot say
    pub async fn generation(&self, resource: &str) -> Option<u64> {
        let key = generation_key(resource);
        match self.store.get(&key).await {
            Ok(None) => Some(0),
            Ok(Some(raw)) => {
                let parsed = std::str::from_utf8(&raw)
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok());
                if parsed.is_none() {
                    tracing::warn!(key = %key, "Unreadable cache generation");
                }
                parsed
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache generation read failed");
                None
            }
        }
    }

    /// Key of the user's session record at its current generation.
    ///
    /// Read it before loading the record to cache, so an invalidation that
    /// lands in between leaves the write on a dead key. `None` when caching
    /// is off or the generation is unknown.
    pub async fn session_key(&self, user_id: &UserId) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        let resource = session_resource(user_id);
        let generation = self.generation(&resource).await?;
        Some(format!("{resource}:{generation}"))
    }

    pub async fn invalidate_session(&self, user_id: &UserId) -> u64 {
        self.invalidate_resource(&session_resource(user_id)).await
    }

    pub fn listing_ttl(&self) -> Duration {
        self.config.listing_ttl
    }

    pub fn session_ttl(&self) -> Duration {
        self.config.session_ttl
    }
}

/// Deterministic key for a read of `path` under `resource` at `generation`.
///
/// Query pairs are sorted, keys lower-cased and empty values dropped, so
/// `?b=2&a=1` and `?A=1&b=2&c=` share an entry.
pub fn listing_key(resource: &str, generation: u64, path: &str, query: Option<&str>) -> String {
    let mut pairs: Vec<(String, &str)> = query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        return format!("{resource}:{generation}:{path}");
    }
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{resource}:{generation}:{path}?{query}")
}

/// Resource a user's session record is versioned under
pub fn session_resource(user_id: &UserId) -> String {
    format!("session:{user_id}")
}

fn generation_key(resource: &str) -> String {
    format!("{NAMESPACE}gen:{resource}")
}

fn namespaced(key: &str) -> String {
    format!("{NAMESPACE}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_key_ignores_order_and_empties() {
        let a = listing_key("products", 0, "/products", Some("category=books&limit=10"));
        let b = listing_key("products", 0, "/products", Some("LIMIT=10&search=&category=books"));
        assert_eq!(a, b);
        assert_eq!(a, "products:0:/products?category=books&limit=10");
    }

    #[test]
    fn test_listing_key_without_query() {
        assert_eq!(listing_key("products", 3, "/products/42", None), "products:3:/products/42");
        assert_eq!(listing_key("products", 3, "/products", Some("")), "products:3:/products");
    }

    #[test]
    fn test_listing_key_keeps_value_case() {
        assert_ne!(
            listing_key("products", 0, "/products", Some("search=Lamp")),
            listing_key("products", 0, "/products", Some("search=lamp"))
        );
    }

    #[test]
    fn test_generation_separates_keys() {
        assert_ne!(
            listing_key("products", 1, "/products", None),
            listing_key("products", 2, "/products", None)
        );
        // generation counters sit outside every resource prefix
        assert!(!generation_key("products").starts_with(&namespaced("products:")));
    }

    #[test]
    fn test_session_resource() {
        let id = UserId::new();
        assert_eq!(session_resource(&id), format!("session:{id}"));
    }
}
