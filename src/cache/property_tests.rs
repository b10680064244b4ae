//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's counting, capacity, recency and expiry rules.

use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::CacheStore;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Has { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Has { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn unique(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

/// Runs `f` on a current-thread runtime whose clock is frozen.
fn with_paused_clock<R>(f: impl FnOnce() -> R) -> R {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    rt.block_on(async move { f() })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits and misses count `get` calls only, and the recency list mirrors the map.
    #[test]
    fn prop_statistics_and_recency_consistency(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = CacheStore::new(8, TEST_DEFAULT_TTL);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value, None),
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Has { key } => {
                    store.has(&key);
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
            }

            let keys = store.keys();
            let distinct: HashSet<&String> = keys.iter().collect();
            prop_assert_eq!(keys.len(), store.len());
            prop_assert_eq!(distinct.len(), keys.len(), "Recency list holds duplicates");
        }

        let stats = store.stats();
        prop_assert_eq!(stats.cache_hits, expected_hits);
        prop_assert_eq!(stats.cache_misses, expected_misses);
        prop_assert_eq!(stats.total_requests, expected_hits + expected_misses);
        prop_assert_eq!(stats.total_items, store.len());
    }

    // Rewriting a key returns the new value and keeps one entry.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);

        store.set(key.clone(), value1, None);
        store.set(key.clone(), value2.clone(), None);

        prop_assert_eq!(store.get(&key), Some(value2));
        prop_assert_eq!(store.len(), 1);
    }

    // The store never holds more than `max_size` entries.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let max_entries = 20;
        let mut store = CacheStore::new(max_entries, TEST_DEFAULT_TTL);

        for (key, value) in entries {
            store.set(key, value, None);
            prop_assert!(store.len() <= max_entries);
        }
    }

    // Filling to capacity and adding one more key evicts exactly the first key.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec(valid_key_strategy(), 3..10),
        new_key in valid_key_strategy(),
    ) {
        let unique_keys = unique(initial_keys);
        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let mut store = CacheStore::new(capacity, TEST_DEFAULT_TTL);
        for key in &unique_keys {
            store.set(key.clone(), format!("value_{}", key), None);
        }

        store.set(new_key.clone(), "new".to_string(), None);

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(!store.has(&unique_keys[0]));
        prop_assert!(store.has(&new_key));
        for key in unique_keys.iter().skip(1) {
            prop_assert!(store.has(key));
        }
    }

    // A `get` between insertions moves the eviction target to the next-oldest key.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        access_index in 0usize..8,
        new_key in valid_key_strategy(),
    ) {
        let unique_keys = unique(keys);
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let mut store = CacheStore::new(capacity, TEST_DEFAULT_TTL);
        for key in &unique_keys {
            store.set(key.clone(), format!("value_{}", key), None);
        }

        let accessed = unique_keys[access_index % capacity].clone();
        store.get(&accessed);
        let expected_evicted = unique_keys
            .iter()
            .find(|k| **k != accessed)
            .cloned()
            .unwrap();

        store.set(new_key.clone(), "new".to_string(), None);

        prop_assert!(store.has(&accessed));
        prop_assert!(!store.has(&expected_evicted));
        prop_assert!(store.has(&new_key));
    }

    // `cleanup_at(t)` removes exactly the entries whose deadline is at or before `t`.
    #[test]
    fn prop_cleanup_removes_exactly_expired(
        ttls in prop::collection::vec(1u64..1_000, 1..30),
        offset_ms in 0u64..1_200,
    ) {
        let (removed, survivors, expected_survivors) = with_paused_clock(|| {
            let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);
            for (i, ttl) in ttls.iter().enumerate() {
                store.set(format!("k{}", i), *ttl, Some(Duration::from_millis(*ttl)));
            }

            let now = Instant::now() + Duration::from_millis(offset_ms);
            let removed = store.cleanup_at(now);

            let survivors: HashSet<String> = store.keys().into_iter().collect();
            let expected: HashSet<String> = ttls
                .iter()
                .enumerate()
                .filter(|(_, ttl)| **ttl > offset_ms)
                .map(|(i, _)| format!("k{}", i))
                .collect();
            (removed, survivors, expected)
        });

        prop_assert_eq!(removed, ttls.len() - expected_survivors.len());
        prop_assert_eq!(survivors, expected_survivors);
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot_cache_always_keeps_latest() {
        let mut store = CacheStore::new(1, TEST_DEFAULT_TTL);
        store.set("a", 1u64, None);
        store.set("b", 2u64, None);

        assert_eq!(store.keys(), vec!["b"]);
        assert_eq!(store.get("b"), Some(2));
        assert_eq!(store.stats().evictions, 1);
    }
}
