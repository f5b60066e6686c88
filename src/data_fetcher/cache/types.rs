//! Cache data structures with TTL support

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Cached upstream response with an absolute expiry instant
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub data: Value,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates a new entry that expires `ttl` after `now`
    pub fn new(key: String, data: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key,
            data,
            cached_at: now,
            expires_at: now + ttl,
        }
    }

    /// An entry is usable strictly before its expiry instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Gets the remaining time until expiration
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Snapshot of cache counters for monitoring and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evicted: u64,
}
