//! Rate Limiting Infrastructure
//!
//! Window arithmetic shared by every counter-based limiter. Windows are
//! aligned to the epoch: `window_start = floor(now / window) * window`.

use std::time::Duration;

/// Limit and window length for one class of requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum requests admitted per window
    pub limit: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitPolicy {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        (self.window.as_millis() as i64).max(1)
    }

    /// Index of the window containing `now_ms`
    pub fn window_index(&self, now_ms: i64) -> i64 {
        now_ms.div_euclid(self.window_ms())
    }

    pub fn window_start_ms(&self, now_ms: i64) -> i64 {
        self.window_index(now_ms) * self.window_ms()
    }

    /// Milliseconds until the next window boundary (never zero)
    pub fn reset_after_ms(&self, now_ms: i64) -> i64 {
        self.window_start_ms(now_ms) + self.window_ms() - now_ms
    }

    /// Whole seconds until the next window boundary, rounded up, at least 1
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let ms = self.reset_after_ms(now_ms).max(1) as u64;
        ms.div_ceil(1000).max(1)
    }

    /// Remaining requests after `count` have been seen in this window
    pub fn remaining(&self, count: u64) -> u32 {
        u64::from(self.limit).saturating_sub(count) as u32
    }

    pub fn admits(&self, count: u64) -> bool {
        count <= u64::from(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_alignment() {
        let policy = RateLimitPolicy::new(5, 60);
        assert_eq!(policy.window_index(0), 0);
        assert_eq!(policy.window_index(59_999), 0);
        assert_eq!(policy.window_index(60_000), 1);
        assert_eq!(policy.window_start_ms(125_000), 120_000);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let policy = RateLimitPolicy::new(5, 60);
        assert_eq!(policy.retry_after_secs(0), 60);
        assert_eq!(policy.retry_after_secs(10_000), 50);
        assert_eq!(policy.retry_after_secs(59_001), 1);
        assert_eq!(policy.retry_after_secs(59_999), 1);
    }

    #[test]
    fn test_admits_and_remaining() {
        let policy = RateLimitPolicy::new(5, 60);
        assert!(policy.admits(5));
        assert!(!policy.admits(6));
        assert_eq!(policy.remaining(3), 2);
        assert_eq!(policy.remaining(9), 0);
    }
}
