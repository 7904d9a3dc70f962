//! Cache-aside accessor.
//!
//! Wraps a [`CacheStore`] with TTL handling. Store faults never reach callers:
//! a failed read is a miss and a failed write is dropped (both logged).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::CacheResult;
use super::store::CacheStore;
use super::types::{CacheEntry, CacheStatus};

/// Cache-aside front for proxy handlers.
#[derive(Clone)]
pub struct CacheAccessor {
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for CacheAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAccessor").finish_non_exhaustive()
    }
}

impl CacheAccessor {
    /// Creates an accessor over `store`.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Returns the live value stored under `key`, or `None` (absent, expired, or store fault).
    pub async fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.get_at(collection, key, Utc::now()).await
    }

    /// [`CacheAccessor::get`] evaluated at an explicit instant.
    pub async fn get_at(&self, collection: &str, key: &str, now: DateTime<Utc>) -> Option<Value> {
        match self.store.find(collection, key).await {
            Ok(Some(entry)) if entry.is_live(now) => {
                debug!(collection, key, "Cache hit");
                Some(entry.value)
            }
            Ok(Some(_)) => {
                debug!(collection, key, "Cache entry expired");
                None
            }
            Ok(None) => {
                debug!(collection, key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(collection, key, error = %e, "Cache read failed; treating as miss");
                None
            }
        }
    }

    /// Upserts `value` under `key` with `expiresAt = now + ttl`.
    pub async fn set(&self, collection: &str, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry::new(key, value, Utc::now(), ttl);
        if let Err(e) = self.store.upsert(collection, entry).await {
            warn!(collection, key, error = %e, "Cache write failed; continuing");
        }
    }

    /// Full cache-aside sequence.
    ///
    /// Returns the cached value on a live hit. Otherwise calls `fetch`, stores a
    /// non-null result for `ttl` and returns it. Fetch errors are returned as-is
    /// and nothing is written.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        collection: &str,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<(Value, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(collection, key).await {
            return Ok((value, CacheStatus::Hit));
        }

        let value = fetch().await?;
        if !value.is_null() {
            self.set(collection, key, value.clone(), ttl).await;
        }

        Ok((value, CacheStatus::Miss))
    }

    /// Deletes expired entries from `collection`.
    pub async fn purge_expired(&self, collection: &str) -> CacheResult<u64> {
        self.store.purge_expired(collection, Utc::now()).await
    }

    /// Creates backend indexes for each collection. Failures are logged.
    pub async fn ensure_indexes(&self, collections: &[&str]) {
        for collection in collections {
            if let Err(e) = self.store.ensure_indexes(collection).await {
                warn!(collection, error = %e, "Failed to ensure cache indexes");
            }
        }
    }

    /// Returns `true` if the backing store answers a ping.
    pub async fn is_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}
