//! In-memory entry store.

use lru::LruCache;
use std::time::Duration;
use tokio::time::Instant;

/// One cached reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: String,
    /// Wall-clock insertion time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub provider: String,
    pub model: String,
    pub(crate) inserted_at: Instant,
}

impl CacheEntry {
    pub(crate) fn new(content: String, provider: String, model: String) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            content,
            timestamp,
            provider,
            model,
            inserted_at: Instant::now(),
        }
    }

    pub(crate) fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Insertion-ordered map with a hard entry limit.
///
/// Backed by an unbounded `LruCache` that is only ever read through `peek`, so
/// the list order stays the insertion order: reads and in-place replacements
/// never move an entry, and `pop_lru` always removes the oldest insert.
pub(crate) struct MemoryStore {
    entries: LruCache<String, CacheEntry>,
    max_entries: usize,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the live entry for `hash`, dropping it first if it has expired.
    pub fn get(&mut self, hash: &str, ttl: Duration, now: Instant) -> Option<&CacheEntry> {
        let expired = self.entries.peek(hash)?.is_expired(ttl, now);
        if expired {
            self.entries.pop(hash);
            return None;
        }
        self.entries.peek(hash)
    }

    /// Inserts or replaces. Returns the key evicted to make room, if any.
    pub fn insert(&mut self, hash: String, entry: CacheEntry) -> Option<String> {
        if let Some(existing) = self.entries.peek_mut(&hash) {
            *existing = entry;
            return None;
        }
        let evicted = if self.entries.len() >= self.max_entries {
            self.entries.pop_lru().map(|(k, _)| k)
        } else {
            None
        };
        self.entries.put(hash, entry);
        evicted
    }

    pub fn remove(&mut self, hash: &str) -> bool {
        self.entries.pop(hash).is_some()
    }

    pub fn purge_expired(&mut self, ttl: Duration, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(ttl, now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired {
            self.entries.pop(k);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
