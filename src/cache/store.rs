//! Cache Store Module
//!
//! Single-owner cache engine: HashMap storage, LRU recency list and lazy TTL expiry.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::stats::round2;
use crate::cache::{CacheCounters, CacheEntry, CacheStats, LruTracker, MemoryFootprint};

/// Fixed bookkeeping cost per entry (timestamps and counters).
pub const ENTRY_OVERHEAD_BYTES: usize = 48;

/// Cost of one slot in the recency list.
pub const RECENCY_SLOT_BYTES: usize = 8;

// == Cache Store ==
/// Cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore<T> {
    entries: HashMap<String, CacheEntry<T>>,
    lru: LruTracker,
    counters: CacheCounters,
    max_size: usize,
    default_ttl: Duration,
}

impl<T> CacheStore<T> {
    // == Constructor ==
    /// Creates a store holding at most `max_size` entries.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            counters: CacheCounters::default(),
            max_size,
            default_ttl,
        }
    }

    // == Set ==
    /// Stores `data` under `key`.
    ///
    /// A new key evicts the least recently used entry when the store is full.
    /// Rewriting an existing key replaces it in place and never evicts.
    /// `None` or a zero TTL falls back to the default TTL.
    pub fn set(&mut self, key: impl Into<String>, data: T, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_lru();
        }

        self.entries.insert(key.clone(), CacheEntry::new(data, ttl));
        self.lru.touch(&key);
    }

    // == Get Entry ==
    /// Looks up a live entry and records the access.
    ///
    /// An expired entry is removed and counted as a miss.
    pub fn get_entry(&mut self, key: &str) -> Option<&CacheEntry<T>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => {
                self.counters.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            self.remove(key);
            self.counters.record_miss();
            return None;
        }

        self.counters.record_hit();
        self.lru.touch(key);
        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        Some(entry)
    }

    // == Has ==
    /// Checks presence without touching stats or recency; drops the key if expired.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            None => return false,
            Some(entry) => entry.is_expired(),
        };
        if expired {
            self.remove(key);
        }
        !expired
    }

    // == Delete ==
    /// Removes `key`. Returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove(key)
    }

    // == Clear ==
    /// Drops every entry and resets the request counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.counters = CacheCounters::default();
    }

    // == Cleanup ==
    /// Removes every entry expired as of now. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(Instant::now())
    }

    /// Removes every entry with `expires_at <= now`.
    pub fn cleanup_at(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Zeroes hit/miss counters, keeping entries.
    pub fn reset_stats(&mut self) {
        self.counters = CacheCounters::default();
    }

    pub fn keys(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            true
        } else {
            false
        }
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.lru.evict_oldest() {
            self.entries.remove(&key);
            self.counters.record_eviction();
            debug!(key = %key, "Evicted least recently used cache entry");
        }
    }
}

impl<T: Clone> CacheStore<T> {
    // == Get ==
    /// Returns a clone of the live value under `key`.
    pub fn get(&mut self, key: &str) -> Option<T> {
        self.get_entry(key).map(|entry| entry.data.clone())
    }
}

impl<T: MemoryFootprint> CacheStore<T> {
    // == Stats ==
    /// Snapshot of the store, including entries that expired but were not yet swept.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let total_items = self.entries.len();
        let mut expired_items = 0;
        let mut total_access: u64 = 0;

        for entry in self.entries.values() {
            if entry.is_expired_at(now) {
                expired_items += 1;
            }
            total_access += entry.access_count;
        }

        let average_access_count = if total_items == 0 {
            0.0
        } else {
            total_access as f64 / total_items as f64
        };

        CacheStats {
            total_items,
            expired_items,
            active_items: total_items - expired_items,
            total_requests: self.counters.total_requests,
            cache_hits: self.counters.hits,
            cache_misses: self.counters.misses(),
            hit_rate: round2(self.counters.hit_rate()),
            evictions: self.counters.evictions,
            memory_usage: self.memory_usage(),
            average_access_count: round2(average_access_count),
        }
    }

    fn memory_usage(&self) -> usize {
        let entries: usize = self
            .entries
            .iter()
            .map(|(key, entry)| key.len() + ENTRY_OVERHEAD_BYTES + entry.data.estimated_bytes())
            .sum();
        entries + self.lru.len() * RECENCY_SLOT_BYTES
    }
}
