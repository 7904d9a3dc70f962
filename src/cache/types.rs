use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached upstream payload.
///
/// `key` identifies exactly one upstream query (the upstream URL, or a composite id
/// for scraped pages). `value` is either a JSON document or a string (HTML).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Opaque cache key.
    pub key: String,
    /// Cached payload.
    pub value: serde_json::Value,
    /// When the entry was written.
    pub fetched_at: DateTime<Utc>,
    /// Instant after which the entry is ignored on read.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry written at `now` that lives for `ttl`.
    pub fn new(
        key: impl Into<String>,
        value: serde_json::Value,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            key: key.into(),
            value,
            fetched_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns `true` while `now` is strictly before `expires_at`.
    #[inline]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Whether a proxy response was served from cache.
pub enum CacheStatus {
    /// Served from a live cache entry.
    Hit,
    /// Fetched from upstream.
    Miss,
}

impl CacheStatus {
    #[inline]
    /// Returns a stable string suitable for the `X-Cache-Status` header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    #[inline]
    /// Returns `true` for [`CacheStatus::Hit`].
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_header_value())
    }
}
