//! Shared constants (collection names, TTLs, intervals).

/// Cache collection for company registry HTML pages.
pub const TWINCN_CACHE_COLLECTION: &str = "twincn_api_cache";

/// Cache collection for government tender API responses.
pub const PCC_CACHE_COLLECTION: &str = "pcc_api_cache";

/// Every cache collection managed by the gateway.
pub const CACHE_COLLECTIONS: [&str; 2] = [TWINCN_CACHE_COLLECTION, PCC_CACHE_COLLECTION];

/// Collection holding per-credential health state.
pub const KEY_STATUS_COLLECTION: &str = "api_key_statuses";

/// Default proxy cache lifetime (24 hours).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "business-magnifier";

/// Default Gemini model used for streaming generation.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Interval between maintenance runs (key reset + cache purge).
pub const MAINTENANCE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Maximum number of recent errors retained per credential.
pub const MAX_RECENT_ERRORS: usize = 3;
