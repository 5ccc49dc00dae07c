//! Redis-backed key-value store
//!
//! Atomic read-modify-write steps run as Lua scripts so that they execute
//! as a single server-side operation.

use std::time::Duration;

use deadpool_redis::{Pool, PoolError, Runtime};
use redis::{AsyncCommands, RedisError, Script};

use super::{KeyValueStore, StoreError, ttl_ms};

const INCR_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('PTTL', KEYS[1]) == -1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

const COMPARE_AND_SWAP_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current ~= ARGV[1] then
    return 0
end
if ARGV[2] == 'del' then
    redis.call('DEL', KEYS[1])
else
    redis.call('SET', KEYS[1], ARGV[3], 'PX', ARGV[4])
end
return 1
"#;

const SCAN_BATCH: usize = 200;

/// Connection settings for [`RedisStore::connect`]
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    pub url: String,
    pub pool_size: usize,
    pub timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 16,
            timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    incr_window: Script,
    compare_and_swap: Script,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            incr_window: Script::new(INCR_WINDOW_SCRIPT),
            compare_and_swap: Script::new(COMPARE_AND_SWAP_SCRIPT),
        }
    }

    /// Build a pool from the config.
    ///
    /// No connection is opened yet; call [`KeyValueStore::ping`] to check
    /// reachability.
    pub fn connect(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let mut cfg = deadpool_redis::Config::from_url(config.url.clone());
        let mut pool_cfg = deadpool_redis::PoolConfig::new(config.pool_size);
        pool_cfg.timeouts.wait = Some(config.timeout);
        pool_cfg.timeouts.create = Some(config.timeout);
        pool_cfg.timeouts.recycle = Some(config.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        Ok(self.pool.get().await?)
    }
}

impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn.pset_ex(key, value, ttl_ms(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;
        let pattern = format!("{}*", escape_glob(prefix));

        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let n: u64 = conn.del(&keys).await?;
                removed += n;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(prefix = %prefix, removed, "Deleted keys by prefix");
        Ok(removed)
    }

    async fn incr_window(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;
        let count: u64 = self
            .incr_window
            .key(key)
            .arg(ttl_ms(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        replacement: Option<&[u8]>,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let mut invocation = self.compare_and_swap.key(key);
        invocation.arg(expected);
        match replacement {
            Some(value) => invocation.arg("set").arg(value).arg(ttl_ms(ttl)),
            None => invocation.arg("del").arg("").arg(0),
        };
        let swapped: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(swapped == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Escape glob metacharacters so a literal prefix can be used with `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StoreError::Unavailable(err.to_string())
        } else if err.kind() == redis::ErrorKind::TypeError {
            StoreError::Corrupt(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("cache:products:"), "cache:products:");
        assert_eq!(
            escape_glob("cache:products:/products?limit=5"),
            "cache:products:/products\\?limit=5"
        );
        assert_eq!(escape_glob("a*b[c]\\"), "a\\*b\\[c\\]\\\\");
    }

    #[test]
    fn test_connect_builds_pool_without_network() {
        let store = RedisStore::connect(&RedisStoreConfig::default());
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let store = RedisStore::connect(&RedisStoreConfig {
            // Port 1 is never a Redis server
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let err = store.ping().await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
    }
}
