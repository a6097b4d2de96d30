//! Expiration Sweep Task
//!
//! Background task that periodically removes expired records from the
//! in-memory repository. Reads already hide expired records; the sweep
//! reclaims their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryRepository;

/// Spawns a background task that periodically purges expired records.
///
/// # Arguments
/// * `repository` - Shared repository to sweep
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let repository = Arc::new(MemoryRepository::new());
/// let cleanup_handle = spawn_cleanup_task(repository.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    repository: Arc<MemoryRepository>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiration sweep with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = repository.purge_expired().await;

            if removed > 0 {
                info!("Expiration sweep: removed {} expired records", removed);
            } else {
                debug!("Expiration sweep: no expired records found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::cluster::NodeId;
    use crate::store::CacheRepository;

    fn record(key: &str, ttl: i64) -> CacheEntry {
        CacheEntry::new("Sweep", &NodeId::new("n"), key, Some("\"v\"".to_string()), ttl)
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_records() {
        let repository = Arc::new(MemoryRepository::new());
        repository.save(record("expire_soon", 500)).await.unwrap();

        let handle = spawn_cleanup_task(repository.clone(), 1);

        // Wait for the record to expire and the sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(repository.is_empty().await, "Expired record should have been swept");

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_live_records() {
        let repository = Arc::new(MemoryRepository::new());
        repository.save(record("long_lived", 3_600_000)).await.unwrap();
        repository.save(record("forever", -1)).await.unwrap();

        let handle = spawn_cleanup_task(repository.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(repository.len().await, 2, "Live records should not be removed");

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let repository = Arc::new(MemoryRepository::new());

        let handle = spawn_cleanup_task(repository, 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
