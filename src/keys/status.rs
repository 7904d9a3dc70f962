//! Per-credential health persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::KeyStatusError;
use super::types::{ApiKeyStatus, KeyHealth, RecentError};
use crate::constants::KEY_STATUS_COLLECTION;

#[async_trait]
/// Storage for [`ApiKeyStatus`] records.
pub trait KeyStatusStore: Send + Sync {
    /// Loads the record for `identifier`.
    async fn load(&self, identifier: &str) -> Result<Option<ApiKeyStatus>, KeyStatusError>;

    /// Inserts or replaces a record.
    async fn save(&self, status: &ApiKeyStatus) -> Result<(), KeyStatusError>;

    /// Returns every record.
    async fn list(&self) -> Result<Vec<ApiKeyStatus>, KeyStatusError>;

    /// Resets every record to healthy with zeroed counters. Returns the count touched.
    async fn reset_all(&self, now: DateTime<Utc>) -> Result<u64, KeyStatusError>;

    /// Creates backend indexes (no-op where not applicable).
    async fn ensure_indexes(&self) -> Result<(), KeyStatusError> {
        Ok(())
    }
}

/// In-memory [`KeyStatusStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyStatusStore {
    records: RwLock<HashMap<String, ApiKeyStatus>>,
}

impl MemoryKeyStatusStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStatusStore for MemoryKeyStatusStore {
    async fn load(&self, identifier: &str) -> Result<Option<ApiKeyStatus>, KeyStatusError> {
        Ok(self.records.read().get(identifier).cloned())
    }

    async fn save(&self, status: &ApiKeyStatus) -> Result<(), KeyStatusError> {
        self.records
            .write()
            .insert(status.key_identifier.clone(), status.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ApiKeyStatus>, KeyStatusError> {
        let mut all: Vec<_> = self.records.read().values().cloned().collect();
        all.sort_by(|a, b| a.key_identifier.cmp(&b.key_identifier));
        Ok(all)
    }

    async fn reset_all(&self, now: DateTime<Utc>) -> Result<u64, KeyStatusError> {
        let mut records = self.records.write();
        for status in records.values_mut() {
            status.reset(now);
        }
        Ok(records.len() as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentErrorDocument {
    error_type: String,
    error_message: String,
    timestamp: bson::DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusDocument {
    key_identifier: String,
    status: KeyHealth,
    #[serde(default)]
    failure_count: u32,
    #[serde(default)]
    daily_failure_count: u32,
    last_checked_at: bson::DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_at: Option<bson::DateTime>,
    #[serde(default)]
    recent_errors: Vec<RecentErrorDocument>,
}

fn to_bson(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson(dt: bson::DateTime) -> Result<DateTime<Utc>, KeyStatusError> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).ok_or_else(|| {
        KeyStatusError::Serialization(format!("timestamp out of range: {}", dt.timestamp_millis()))
    })
}

impl From<&ApiKeyStatus> for StatusDocument {
    fn from(status: &ApiKeyStatus) -> Self {
        Self {
            key_identifier: status.key_identifier.clone(),
            status: status.status,
            failure_count: status.failure_count,
            daily_failure_count: status.daily_failure_count,
            last_checked_at: to_bson(status.last_checked_at),
            retry_at: status.retry_at.map(to_bson),
            recent_errors: status
                .recent_errors
                .iter()
                .map(|e| RecentErrorDocument {
                    error_type: e.error_type.clone(),
                    error_message: e.error_message.clone(),
                    timestamp: to_bson(e.timestamp),
                })
                .collect(),
        }
    }
}

impl TryFrom<StatusDocument> for ApiKeyStatus {
    type Error = KeyStatusError;

    fn try_from(doc: StatusDocument) -> Result<Self, Self::Error> {
        let recent_errors = doc
            .recent_errors
            .into_iter()
            .map(|e| {
                Ok(RecentError {
                    error_type: e.error_type,
                    error_message: e.error_message,
                    timestamp: from_bson(e.timestamp)?,
                })
            })
            .collect::<Result<Vec<_>, KeyStatusError>>()?;

        Ok(Self {
            key_identifier: doc.key_identifier,
            status: doc.status,
            failure_count: doc.failure_count,
            daily_failure_count: doc.daily_failure_count,
            last_checked_at: from_bson(doc.last_checked_at)?,
            retry_at: doc.retry_at.map(from_bson).transpose()?,
            recent_errors,
        })
    }
}

/// MongoDB [`KeyStatusStore`] over the `api_key_statuses` collection.
#[derive(Debug, Clone)]
pub struct MongoKeyStatusStore {
    collection: Collection<StatusDocument>,
}

impl MongoKeyStatusStore {
    /// Uses the default collection in `db`.
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(KEY_STATUS_COLLECTION),
        }
    }
}

#[async_trait]
impl KeyStatusStore for MongoKeyStatusStore {
    async fn load(&self, identifier: &str) -> Result<Option<ApiKeyStatus>, KeyStatusError> {
        let found = self
            .collection
            .find_one(doc! { "keyIdentifier": identifier })
            .await?;
        found.map(ApiKeyStatus::try_from).transpose()
    }

    async fn save(&self, status: &ApiKeyStatus) -> Result<(), KeyStatusError> {
        self.collection
            .replace_one(
                doc! { "keyIdentifier": status.key_identifier.as_str() },
                StatusDocument::from(status),
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ApiKeyStatus>, KeyStatusError> {
        let docs: Vec<StatusDocument> = self
            .collection
            .find(doc! {})
            .sort(doc! { "keyIdentifier": 1 })
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(ApiKeyStatus::try_from).collect()
    }

    async fn reset_all(&self, now: DateTime<Utc>) -> Result<u64, KeyStatusError> {
        let result = self
            .collection
            .update_many(
                doc! {},
                doc! {
                    "$set": {
                        "status": KeyHealth::Healthy.as_str(),
                        "failureCount": 0,
                        "dailyFailureCount": 0,
                        "lastCheckedAt": to_bson(now),
                    },
                    "$unset": { "retryAt": "" },
                },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn ensure_indexes(&self) -> Result<(), KeyStatusError> {
        let unique = IndexModel::builder()
            .keys(doc! { "keyIdentifier": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_status = IndexModel::builder().keys(doc! { "status": 1 }).build();

        self.collection.create_indexes([unique, by_status]).await?;
        Ok(())
    }
}
