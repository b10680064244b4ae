//! Cache Statistics Module
//!
//! Hit/miss counters and the snapshot reported by `SmartCache::stats`.

use serde::Serialize;

// == Counters ==
/// Running request counters owned by the store.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    /// Every `get`, hit or miss
    pub total_requests: u64,
    /// `get` calls that returned a live value
    pub hits: u64,
    /// Entries dropped by the LRU policy
    pub evictions: u64,
}

impl CacheCounters {
    pub fn record_hit(&mut self) {
        self.total_requests += 1;
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.total_requests += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn misses(&self) -> u64 {
        self.total_requests - self.hits
    }

    // == Hit Rate ==
    /// Percentage of `get` calls that hit, 0 before any request.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64 * 100.0
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of a cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_items: usize,
    /// Entries past their deadline that no one has touched yet
    pub expired_items: usize,
    pub active_items: usize,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Percent, two decimals
    pub hit_rate: f64,
    pub evictions: u64,
    /// Heuristic estimate in bytes
    pub memory_usage: usize,
    pub average_access_count: f64,
}

/// Rounds to two decimals for reporting.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        let counters = CacheCounters::default();
        assert_eq!(counters.hit_rate(), 0.0);
        assert_eq!(counters.misses(), 0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut counters = CacheCounters::default();
        counters.record_hit();
        counters.record_miss();
        counters.record_miss();
        counters.record_hit();

        assert_eq!(counters.total_requests, 4);
        assert_eq!(counters.misses(), 2);
        assert_eq!(counters.hit_rate(), 50.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.333_333), 33.33);
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(0.0), 0.0);
    }
}
