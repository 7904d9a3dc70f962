//! In-process cache store (moka).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::sync::Cache;

use super::error::CacheResult;
use super::store::CacheStore;
use super::types::CacheEntry;

/// Bounded in-memory [`CacheStore`] keyed by `(collection, key)`.
///
/// Expiry is evaluated by the accessor on read; entries are only dropped by
/// capacity eviction or [`CacheStore::purge_expired`].
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Cache<(String, String), CacheEntry>,
}

impl MemoryCacheStore {
    const DEFAULT_CAPACITY: u64 = 10_000;

    /// Creates a store with the default capacity.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a store with a max entry capacity.
    #[inline]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Returns the approximate number of entries across all collections.
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Returns `true` if the store holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn find(&self, collection: &str, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self
            .entries
            .get(&(collection.to_string(), key.to_string())))
    }

    async fn upsert(&self, collection: &str, entry: CacheEntry) -> CacheResult<()> {
        self.entries
            .insert((collection.to_string(), entry.key.clone()), entry);
        Ok(())
    }

    async fn purge_expired(&self, collection: &str, now: DateTime<Utc>) -> CacheResult<u64> {
        let expired: Vec<_> = self
            .entries
            .iter()
            .filter(|(k, v)| k.0 == collection && !v.is_live(now))
            .map(|(k, _)| k)
            .collect();

        for key in &expired {
            self.entries.invalidate(key.as_ref());
        }

        Ok(expired.len() as u64)
    }

    async fn ensure_indexes(&self, _collection: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}
