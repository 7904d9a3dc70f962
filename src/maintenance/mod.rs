//! Daily maintenance: key status reset and expired cache purge.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{info, warn};

use crate::cache::CacheAccessor;
use crate::constants::{CACHE_COLLECTIONS, MAINTENANCE_INTERVAL_SECS};
use crate::keys::KeyStatusStore;

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Key status records reset (`None` if the reset failed).
    pub keys_reset: Option<u64>,
    /// Expired entries purged per collection (`None` if the purge failed).
    pub purged: Vec<(String, Option<u64>)>,
}

/// Resets key health and purges expired cache entries.
#[derive(Clone)]
pub struct MaintenanceTask {
    cache: CacheAccessor,
    key_statuses: Arc<dyn KeyStatusStore>,
    interval: Duration,
}

impl MaintenanceTask {
    /// Creates a task running every 24 hours.
    pub fn new(cache: CacheAccessor, key_statuses: Arc<dyn KeyStatusStore>) -> Self {
        Self {
            cache,
            key_statuses,
            interval: Duration::from_secs(MAINTENANCE_INTERVAL_SECS),
        }
    }

    /// Overrides the run interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs one pass. Individual failures are logged and reported, never propagated.
    pub async fn run_once(&self) -> MaintenanceReport {
        let keys_reset = match self.key_statuses.reset_all(Utc::now()).await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "Key status reset failed");
                None
            }
        };

        let mut purged = Vec::with_capacity(CACHE_COLLECTIONS.len());
        for collection in CACHE_COLLECTIONS {
            let removed = match self.cache.purge_expired(collection).await {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(collection, error = %e, "Cache purge failed");
                    None
                }
            };
            purged.push((collection.to_string(), removed));
        }

        let report = MaintenanceReport { keys_reset, purged };
        info!(?report, "Maintenance pass complete");
        report
    }

    /// Runs immediately, then once per interval, until the task is aborted.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.interval);
            loop {
                interval.tick().await;
                self.run_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FailingCacheStore, MemoryCacheStore};
    use crate::constants::{PCC_CACHE_COLLECTION, TWINCN_CACHE_COLLECTION};
    use crate::keys::{ApiKeyStatus, KeyHealth, MemoryKeyStatusStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_run_once_resets_keys_and_purges() {
        let cache = CacheAccessor::new(Arc::new(MemoryCacheStore::new()));
        cache.set(PCC_CACHE_COLLECTION, "old", json!(1), Duration::ZERO).await;
        cache.set(PCC_CACHE_COLLECTION, "new", json!(2), Duration::from_secs(60)).await;
        cache.set(TWINCN_CACHE_COLLECTION, "old", json!("<html/>"), Duration::ZERO).await;

        let statuses = Arc::new(MemoryKeyStatusStore::new());
        let mut degraded = ApiKeyStatus::new("A", Utc::now());
        degraded.status = KeyHealth::Degraded;
        degraded.daily_failure_count = 20;
        statuses.save(&degraded).await.unwrap();

        let task = MaintenanceTask::new(cache.clone(), statuses.clone());
        let report = task.run_once().await;

        assert_eq!(report.keys_reset, Some(1));
        assert_eq!(
            report.purged,
            vec![
                (TWINCN_CACHE_COLLECTION.to_string(), Some(1)),
                (PCC_CACHE_COLLECTION.to_string(), Some(1)),
            ]
        );
        assert!(cache.get(PCC_CACHE_COLLECTION, "new").await.is_some());
        let a = statuses.load("A").await.unwrap().unwrap();
        assert_eq!(a.status, KeyHealth::Healthy);
        assert_eq!(a.daily_failure_count, 0);
    }

    #[tokio::test]
    async fn test_run_once_reports_store_failures() {
        let cache = CacheAccessor::new(Arc::new(FailingCacheStore));
        let task = MaintenanceTask::new(cache, Arc::new(MemoryKeyStatusStore::new()));

        let report = task.run_once().await;

        assert_eq!(report.keys_reset, Some(0));
        assert!(report.purged.iter().all(|(_, n)| n.is_none()));
    }

    #[tokio::test]
    async fn test_spawn_runs_immediately() {
        let statuses = Arc::new(MemoryKeyStatusStore::new());
        let mut status = ApiKeyStatus::new("A", Utc::now());
        status.failure_count = 2;
        statuses.save(&status).await.unwrap();

        let cache = CacheAccessor::new(Arc::new(MemoryCacheStore::new()));
        let handle = MaintenanceTask::new(cache, statuses.clone())
            .with_interval(Duration::from_secs(3600))
            .spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let a = statuses.load("A").await.unwrap().unwrap();
        assert_eq!(a.failure_count, 0);
    }
}
