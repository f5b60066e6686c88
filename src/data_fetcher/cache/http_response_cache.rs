use lru::LruCache;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use super::types::{CacheEntry, CacheStats};
use crate::clock::Clock;
use crate::constants::cache;
use crate::error::AppError;

/// In-process cache of upstream responses keyed by request signature.
///
/// Every entry shares one TTL. Expired entries are dropped when they are
/// next looked up, and [`ResponseCache::sweep`] (run periodically by
/// [`ResponseCache::spawn_sweeper`]) clears the ones nobody asks for again.
/// Concurrent misses on one key are coalesced: the first caller runs the
/// producer and the rest wait for it and read what it stored.
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted: AtomicU64,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(cache::TTL_SECONDS as i64));
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Cache with the default TTL and capacity.
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Duration::from_secs(cache::TTL_SECONDS),
            cache::MAX_ENTRIES,
            clock,
        )
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Fresh value for `key`, dropping the entry if it has expired.
    async fn lookup(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                debug!(
                    "Cache hit: key={}, expires_in={}s",
                    key,
                    entry.time_until_expiry(now).num_seconds()
                );
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!("Removing expired cache entry: key={key}");
                entries.pop(key);
                self.evicted.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => None,
        }
    }

    /// Returns the cached value for `key` if present and unexpired.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let value = self.lookup(key).await;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Stores `data` under `key`, expiring one TTL from now.
    pub async fn insert(&self, key: &str, data: Value) {
        let now = self.clock.now();
        let entry = CacheEntry::new(key.to_string(), data, now, self.ttl);
        let mut entries = self.entries.lock().await;
        if let Some((old_key, _)) = entries.push(key.to_string(), entry)
            && old_key != key
        {
            debug!("Evicted least recently used entry: key={old_key}");
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns the cached value for `key`, or runs `producer`, caches its
    /// value and returns it. Producer errors are returned and never cached.
    #[instrument(skip(self, producer))]
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, producer: F) -> Result<Value, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, AppError>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = {
            let _turn = gate.lock().await;
            // Whoever held the gate before us may have filled the entry
            if let Some(value) = self.get(key).await {
                debug!("Served coalesced request from cache: key={key}");
                Ok(value)
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss: key={key}");
                match producer().await {
                    Ok(value) => {
                        self.insert(key, value.clone()).await;
                        info!("Cached response: key={}, ttl={}s", key, self.ttl.num_seconds());
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        };

        self.release_gate(key, &gate).await;
        result
    }

    async fn release_gate(&self, key: &str, gate: &Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // One reference in the map plus ours means nobody else is waiting
        if Arc::strong_count(gate) <= 2
            && in_flight
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, gate))
        {
            in_flight.remove(key);
        }
    }

    /// Removes every expired entry and returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        self.evicted
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    /// Sweeps on a fixed interval until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("Response cache dropped, stopping sweeper");
                    break;
                };
                let removed = cache.sweep().await;
                if removed > 0 {
                    debug!("Swept {removed} expired cache entries");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().await;
        CacheStats {
            entries: entries.len(),
            capacity: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}
