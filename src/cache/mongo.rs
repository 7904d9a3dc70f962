//! MongoDB cache store.
//!
//! One collection per upstream domain. Documents look like
//! `{_id: <key>, value: <json>, fetchedAt: <date>, expiresAt: <date>}`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{CacheError, CacheResult};
use super::store::CacheStore;
use super::types::CacheEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(rename = "_id")]
    key: String,
    value: serde_json::Value,
    #[serde(rename = "fetchedAt")]
    fetched_at: bson::DateTime,
    #[serde(rename = "expiresAt")]
    expires_at: bson::DateTime,
}

fn to_bson(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson(dt: bson::DateTime) -> CacheResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).ok_or_else(|| {
        CacheError::Serialization(format!("timestamp out of range: {}", dt.timestamp_millis()))
    })
}

impl From<CacheEntry> for CacheDocument {
    fn from(entry: CacheEntry) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
            fetched_at: to_bson(entry.fetched_at),
            expires_at: to_bson(entry.expires_at),
        }
    }
}

impl TryFrom<CacheDocument> for CacheEntry {
    type Error = CacheError;

    fn try_from(doc: CacheDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            key: doc.key,
            value: doc.value,
            fetched_at: from_bson(doc.fetched_at)?,
            expires_at: from_bson(doc.expires_at)?,
        })
    }
}

/// [`CacheStore`] backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoCacheStore {
    db: Database,
    ttl_index: bool,
}

impl MongoCacheStore {
    /// Wraps a database handle. When `ttl_index` is set, [`CacheStore::ensure_indexes`]
    /// creates an `expiresAt` TTL index so the server drops stale documents.
    pub fn new(db: Database, ttl_index: bool) -> Self {
        Self { db, ttl_index }
    }

    fn collection(&self, name: &str) -> Collection<CacheDocument> {
        self.db.collection(name)
    }
}

#[async_trait]
impl CacheStore for MongoCacheStore {
    async fn find(&self, collection: &str, key: &str) -> CacheResult<Option<CacheEntry>> {
        let found = self
            .collection(collection)
            .find_one(doc! { "_id": key })
            .await?;

        found.map(CacheEntry::try_from).transpose()
    }

    async fn upsert(&self, collection: &str, entry: CacheEntry) -> CacheResult<()> {
        let key = entry.key.clone();
        let document = CacheDocument::from(entry);

        self.collection(collection)
            .replace_one(doc! { "_id": key.as_str() }, document)
            .upsert(true)
            .await?;

        debug!(collection, key = %key, "Cache entry written");
        Ok(())
    }

    async fn purge_expired(&self, collection: &str, now: DateTime<Utc>) -> CacheResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(doc! { "expiresAt": { "$lte": to_bson(now) } })
            .await?;

        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self, collection: &str) -> CacheResult<()> {
        if !self.ttl_index {
            return Ok(());
        }

        let model = IndexModel::builder()
            .keys(doc! { "expiresAt": 1 })
            .options(
                IndexOptions::builder()
                    .name("expiresAt_ttl".to_string())
                    .expire_after(Duration::ZERO)
                    .build(),
            )
            .build();

        self.collection(collection).create_index(model).await?;
        info!(collection, "TTL index ensured");
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
