//! Rate-limit window store port
//!
//! A keyed set of members scored by millisecond timestamps. Each call is one
//! store operation; callers get no atomicity across calls.

use async_trait::async_trait;

use crate::error::RateLimitError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Insert `member` scored by `score_ms`
    async fn add(&self, key: &str, member: &str, score_ms: i64) -> Result<(), RateLimitError>;

    /// Remove every member scored strictly below `cutoff_ms`
    async fn remove_before(&self, key: &str, cutoff_ms: i64) -> Result<(), RateLimitError>;

    /// Number of members under `key`
    async fn count(&self, key: &str) -> Result<u64, RateLimitError>;

    /// Reset the key's time-to-live
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), RateLimitError>;
}

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}
