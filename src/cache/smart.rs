//! Smart Cache Module
//!
//! Shared-handle cache with an optional, owned auto-cleanup timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore, MemoryFootprint};
use crate::error::ConfigError;
use crate::sync::lock;
use crate::tasks::spawn_cleanup_task;

// == Cache Config ==
/// Construction options for [`SmartCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction
    pub max_size: usize,
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Spawn a background sweep of expired entries
    pub auto_cleanup: bool,
    /// Period of the background sweep
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            default_ttl: Duration::from_secs(60 * 60),
            auto_cleanup: false,
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::invalid("max_size", "must be greater than 0"));
        }
        if self.default_ttl.is_zero() {
            return Err(ConfigError::invalid("default_ttl", "must be greater than 0"));
        }
        if self.auto_cleanup && self.cleanup_interval.is_zero() {
            return Err(ConfigError::invalid(
                "cleanup_interval",
                "must be greater than 0 when auto_cleanup is enabled",
            ));
        }
        Ok(())
    }
}

// == Smart Cache ==
/// Key/value cache with per-entry TTL and LRU eviction.
///
/// Every method locks the store once and returns without suspending, so
/// operations are atomic with respect to each other.
#[derive(Debug)]
pub struct SmartCache<T> {
    store: Arc<Mutex<CacheStore<T>>>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> SmartCache<T> {
    /// Builds a cache from `config`.
    ///
    /// With `auto_cleanup` the sweep task is spawned on the current tokio
    /// runtime; calling this outside a runtime fails with `NoRuntime`.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = Arc::new(Mutex::new(CacheStore::new(
            config.max_size,
            config.default_ttl,
        )));

        let cleanup_task = if config.auto_cleanup {
            Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
            Some(spawn_cleanup_task(store.clone(), config.cleanup_interval))
        } else {
            None
        };

        Ok(Self {
            store,
            cleanup_task: Mutex::new(cleanup_task),
        })
    }
}

impl<T> SmartCache<T> {
    pub fn set(&self, key: impl Into<String>, data: T, ttl: Option<Duration>) {
        lock(&self.store).set(key, data, ttl);
    }

    /// See [`CacheStore::has`]: no stats, no recency change, expired keys are dropped.
    pub fn has(&self, key: &str) -> bool {
        lock(&self.store).has(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        lock(&self.store).delete(key)
    }

    pub fn clear(&self) {
        lock(&self.store).clear();
    }

    /// Sweeps expired entries now. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        lock(&self.store).cleanup()
    }

    pub fn reset_stats(&self) {
        lock(&self.store).reset_stats();
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        lock(&self.store).keys()
    }

    pub fn size(&self) -> usize {
        lock(&self.store).len()
    }

    pub fn is_auto_cleanup_running(&self) -> bool {
        lock(&self.cleanup_task).is_some()
    }

    /// Cancels the background sweep, if any. Entries are kept.
    pub fn stop_auto_cleanup(&self) {
        if let Some(handle) = lock(&self.cleanup_task).take() {
            handle.abort();
            debug!("Auto-cleanup task stopped");
        }
    }

    /// Cancels the background sweep and drops every entry.
    pub fn destroy(&self) {
        self.stop_auto_cleanup();
        self.clear();
    }
}

impl<T: Clone> SmartCache<T> {
    /// Returns the live value under `key`; expired hits count as misses.
    pub fn get(&self, key: &str) -> Option<T> {
        lock(&self.store).get(key)
    }
}

impl<T: MemoryFootprint> SmartCache<T> {
    pub fn stats(&self) -> CacheStats {
        lock(&self.store).stats()
    }
}

impl<T> Drop for SmartCache<T> {
    fn drop(&mut self) {
        self.stop_auto_cleanup();
    }
}
