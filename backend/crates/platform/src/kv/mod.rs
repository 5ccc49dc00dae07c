//! Key-value store contract
//!
//! The admission layer keeps every piece of cross-request state here:
//! cache entries, rate-limit counters and refresh rotation markers. Each
//! operation is independently atomic; there are no multi-key transactions.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::{RedisStore, RedisStoreConfig};

use std::time::Duration;

use thiserror::Error;

/// Key-value store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (pool exhausted, connection refused, timeout)
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error
    #[error("key-value store command failed: {0}")]
    Command(String),

    /// A stored value did not have the expected shape
    #[error("corrupt value at key {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Shared key-value store with per-key expiry.
///
/// Every write carries a TTL; nothing stored through this trait lives forever.
#[trait_variant::make(KeyValueStore: Send)]
pub trait LocalKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Returns `true` when a key was removed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove every key starting with `prefix`; returns how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StoreError>;

    /// Atomically increment a counter and return the new value.
    ///
    /// The TTL is applied when the counter is created, and re-applied if the
    /// key somehow lost its expiry.
    async fn incr_window(&self, key: &str, ttl: Duration) -> Result<u64, StoreError>;

    /// Atomically replace the value at `key` if it currently equals `expected`.
    ///
    /// `replacement = None` deletes the key instead. Returns `false` when the
    /// current value differs (including when the key is absent).
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        replacement: Option<&[u8]>,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Clamp a TTL to at least one millisecond.
pub(crate) fn ttl_ms(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}
