//! In-process key-value store
//!
//! Single-instance deployments and tests. Expired entries are dropped lazily
//! on access, and swept every [`SWEEP_INTERVAL`] writes so keys that are
//! never read again (old rate-limit windows) do not pile up. Each operation
//! holds at most one shard lock, which is what makes `incr_window` and
//! `compare_and_swap` atomic here.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use super::{KeyValueStore, StoreError};

const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Writes between two full sweeps of expired entries
pub const SWEEP_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn new(value: Vec<u8>, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now
                .checked_add(ttl.min(MAX_TTL))
                .unwrap_or(now + MAX_TTL),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Count a write and sweep on every interval.
    ///
    /// Must not be called while an entry guard is held.
    fn note_write(&self) {
        let n = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if n % SWEEP_INTERVAL == 0 {
            let removed = self.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired entries");
            }
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone());
        if hit.is_none() {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.note_write();
        let now = Instant::now();
        self.entries
            .insert(key.to_owned(), Entry::new(value.to_vec(), now, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, e)| !e.is_expired(now)))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut removed = 0u64;
        self.entries.retain(|key, entry| {
            if !key.starts_with(prefix) {
                return true;
            }
            if !entry.is_expired(now) {
                removed += 1;
            }
            false
        });
        Ok(removed)
    }

    async fn incr_window(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        self.note_write();
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::new(b"0".to_vec(), now, ttl));
        if entry.is_expired(now) {
            *entry = Entry::new(b"0".to_vec(), now, ttl);
        }

        let current = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| StoreError::Corrupt(key.to_owned()))?;
        let next = current + 1;
        entry.value = next.to_string().into_bytes();
        Ok(next)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        replacement: Option<&[u8]>,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.entries.entry(key.to_owned()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.remove();
                    return Ok(false);
                }
                if occupied.get().value != expected {
                    return Ok(false);
                }
                match replacement {
                    Some(value) => {
                        occupied.insert(Entry::new(value.to_vec(), now, ttl));
                    }
                    None => {
                        occupied.remove();
                    }
                }
                Ok(true)
            }
            MapEntry::Vacant(_) => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", b"1", TTL).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        store
            .set("short", b"x", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_prefix() {
        let store = MemoryStore::new();
        store.set("cache:products:a", b"1", TTL).await.unwrap();
        store.set("cache:products:b", b"2", TTL).await.unwrap();
        store.set("cache:users:a", b"3", TTL).await.unwrap();

        assert_eq!(store.delete_prefix("cache:products:").await.unwrap(), 2);
        assert_eq!(store.get("cache:products:a").await.unwrap(), None);
        assert!(store.get("cache:users:a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_incr_window_counts_and_resets_after_expiry() {
        let store = MemoryStore::new();
        let ttl = Duration::from_millis(30);
        assert_eq!(store.incr_window("n", ttl).await.unwrap(), 1);
        assert_eq!(store.incr_window("n", ttl).await.unwrap(), 2);
        assert_eq!(store.get("n").await.unwrap(), Some(b"2".to_vec()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.incr_window("n", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unread_expired_keys_are_swept() {
        let store = MemoryStore::new();
        // one bucket per window, never read again once the window passes
        for window in 0..10 {
            store
                .incr_window(&format!("rate_limit:general:ip:1:{window}"), Duration::from_millis(10))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.entries.len(), 10);

        for i in 10..SWEEP_INTERVAL {
            store.set(&format!("live:{i}"), b"x", TTL).await.unwrap();
        }
        assert_eq!(store.entries.len(), (SWEEP_INTERVAL - 10) as usize);
        assert!(store.entries.iter().all(|e| e.key().starts_with("live:")));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store.set("gone", b"x", Duration::from_millis(10)).await.unwrap();
        store.set("kept", b"y", TTL).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.get("kept").await.unwrap(), Some(b"y".to_vec()));
    }

    #[tokio::test]
    async fn test_incr_window_rejects_non_counter() {
        let store = MemoryStore::new();
        store.set("n", b"abc", TTL).await.unwrap();
        let err = store.incr_window("n", TTL).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_incr_window_is_atomic_across_tasks() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.incr_window("hot", TTL).await.unwrap()
            }));
        }
        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=50).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = MemoryStore::new();
        // absent key never matches
        assert!(!store.compare_and_swap("m", b"v1", Some(b"v2"), TTL).await.unwrap());

        store.set("m", b"v1", TTL).await.unwrap();
        assert!(!store.compare_and_swap("m", b"zz", Some(b"v2"), TTL).await.unwrap());
        assert!(store.compare_and_swap("m", b"v1", Some(b"v2"), TTL).await.unwrap());
        assert_eq!(store.get("m").await.unwrap(), Some(b"v2".to_vec()));

        // stale expectation after a swap
        assert!(!store.compare_and_swap("m", b"v1", Some(b"v3"), TTL).await.unwrap());

        // delete mode
        assert!(store.compare_and_swap("m", b"v2", None, TTL).await.unwrap());
        assert_eq!(store.get("m").await.unwrap(), None);
    }
}
