//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired cache entries.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::sync::lock;

/// Spawns a task that calls `cleanup()` on `store` every `interval`.
///
/// The task runs until its handle is aborted; `SmartCache` owns the handle
/// and aborts it on `stop_auto_cleanup`, `destroy` or drop.
///
/// # Example
/// ```ignore
/// let store = Arc::new(Mutex::new(CacheStore::<String>::new(1000, ttl)));
/// let handle = spawn_cleanup_task(store.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<T>(store: Arc<Mutex<CacheStore<T>>>, interval: Duration) -> JoinHandle<()>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting TTL cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = lock(&store).cleanup();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_store() -> Arc<Mutex<CacheStore<String>>> {
        Arc::new(Mutex::new(CacheStore::new(100, Duration::from_secs(300))))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let store = shared_store();
        lock(&store).set("expire_soon", "value".to_string(), Some(Duration::from_secs(1)));

        let handle = spawn_cleanup_task(store.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(2500)).await;

        // `len` does not check expiry, so a zero here means the sweep ran
        assert_eq!(lock(&store).len(), 0);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let store = shared_store();
        lock(&store).set("long_lived", "value".to_string(), Some(Duration::from_secs(3600)));

        let handle = spawn_cleanup_task(store.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(lock(&store).get("long_lived"), Some("value".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(shared_store(), Duration::from_secs(1));

        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
