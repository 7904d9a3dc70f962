use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::CacheResult;
use super::types::CacheEntry;

#[async_trait]
/// Document store backing the proxy caches.
///
/// Collections are logical namespaces (one per upstream domain).
pub trait CacheStore: Send + Sync {
    /// Fetches the entry stored under `key`, expired or not.
    async fn find(&self, collection: &str, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Inserts or replaces the entry under `entry.key`.
    async fn upsert(&self, collection: &str, entry: CacheEntry) -> CacheResult<()>;

    /// Deletes entries whose `expires_at` is at or before `now`. Returns the count removed.
    async fn purge_expired(&self, collection: &str, now: DateTime<Utc>) -> CacheResult<u64>;

    /// Creates backend indexes for `collection` (no-op where not applicable).
    async fn ensure_indexes(&self, collection: &str) -> CacheResult<()>;

    /// Round-trips to the backend.
    async fn ping(&self) -> CacheResult<()>;
}

#[cfg(any(test, feature = "mock"))]
/// Store whose every operation fails, for exercising degraded paths.
#[derive(Debug, Default, Clone)]
pub struct FailingCacheStore;

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn find(&self, _collection: &str, _key: &str) -> CacheResult<Option<CacheEntry>> {
        Err(super::CacheError::Unavailable("connection refused".to_string()))
    }

    async fn upsert(&self, _collection: &str, _entry: CacheEntry) -> CacheResult<()> {
        Err(super::CacheError::Unavailable("connection refused".to_string()))
    }

    async fn purge_expired(&self, _collection: &str, _now: DateTime<Utc>) -> CacheResult<u64> {
        Err(super::CacheError::Unavailable("connection refused".to_string()))
    }

    async fn ensure_indexes(&self, _collection: &str) -> CacheResult<()> {
        Err(super::CacheError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> CacheResult<()> {
        Err(super::CacheError::Unavailable("connection refused".to_string()))
    }
}
