//! Response cache: TTL, capacity, statistics and the background sweeper.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::backend::{CacheEntry, MemoryStore};
use super::key::CacheKey;
use crate::types::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 3600),
            max_entries: 1000,
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
    pub fn with_ttl_hours(self, hours: u64) -> Self {
        self.with_ttl(Duration::from_secs(hours.saturating_mul(3600)))
    }
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub evictions: u64,
    pub hit_rate: f64,
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }
    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

struct CacheInner {
    config: CacheConfig,
    store: Mutex<MemoryStore>,
    stats: AtomicStats,
}

impl CacheInner {
    // The store holds plain data, so a panic elsewhere cannot leave it half-updated.
    fn store(&self) -> MutexGuard<'_, MemoryStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn purge_expired(&self) -> usize {
        self.store().purge_expired(self.config.ttl, Instant::now())
    }
}

/// Content-addressed memo of non-streaming chat replies.
///
/// Cloning is cheap and every clone shares the same entries and counters.
/// A missing or expired key is reported as `None`; no operation fails.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<CacheInner>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let store = MemoryStore::new(config.max_entries);
        Self {
            inner: Arc::new(CacheInner {
                config,
                store: Mutex::new(store),
                stats: AtomicStats::new(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn generate_key(messages: &[Message], model: &str) -> CacheKey {
        CacheKey::generate(messages, model)
    }

    /// Cached content for `key`. Bumps exactly one of the hit/miss counters.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let found = self
            .inner
            .store()
            .get(key.as_str(), self.inner.config.ttl, Instant::now())
            .map(|e| e.content.clone());
        match found {
            Some(content) => {
                self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = key.short(), "response cache hit");
                Some(content)
            }
            None => {
                self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = key.short(), "response cache miss");
                None
            }
        }
    }

    /// Copy of the full entry without touching the counters.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner
            .store()
            .get(key.as_str(), self.inner.config.ttl, Instant::now())
            .cloned()
    }

    pub fn set(
        &self,
        key: CacheKey,
        content: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) {
        let entry = CacheEntry::new(content.into(), provider.into(), model.into());
        let short = key.short().to_string();
        let evicted = self.inner.store().insert(key.hash, entry);
        if let Some(old) = evicted {
            self.inner.stats.evictions.fetch_add(1, Ordering::Relaxed);
            let end = old.len().min(super::key::LOGGED_KEY_LEN);
            debug!(
                cache_key = short.as_str(),
                evicted_key = &old[..end],
                "response cache full, evicted oldest entry"
            );
        } else {
            debug!(cache_key = short.as_str(), "response cached");
        }
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.store().remove(key.as_str())
    }

    /// Drops every entry and zeroes the counters.
    pub fn clear(&self) {
        let mut store = self.inner.store();
        store.clear();
        self.inner.stats.reset();
    }

    pub fn len(&self) -> usize {
        self.inner.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry older than the TTL. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.inner.stats.hits.load(Ordering::Relaxed);
        let misses = self.inner.stats.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            size: self.len(),
            evictions: self.inner.stats.evictions.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    /// Start the periodic expiry sweep on the current Tokio runtime.
    ///
    /// The task only holds a weak reference: it ends on its own once every
    /// clone of the cache is dropped, or earlier through the returned handle.
    pub fn spawn_sweeper(&self) -> SweepHandle {
        let weak: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let removed = inner.purge_expired();
                if removed > 0 {
                    debug!(removed, "swept expired response cache entries");
                }
            }
        });
        SweepHandle { task: Some(task) }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("config", &self.inner.config)
            .field("size", &self.len())
            .finish()
    }
}

/// Owner of a running sweep task. Dropping it stops the sweep.
#[derive(Debug)]
pub struct SweepHandle {
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    pub fn stop(mut self) {
        self.abort();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
