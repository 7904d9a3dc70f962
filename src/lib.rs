//! Business Magnifier library crate (used by the gateway server and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`CacheEntry`], [`CacheAccessor`] - Cache-aside access over a [`CacheStore`]
//! - [`MongoCacheStore`], [`MemoryCacheStore`] - Cache store backends
//! - [`UpstreamClient`] - Company registry and tender API client
//!
//! ## AI Key Rotation
//! - [`KeyRotator`], [`RotationState`], [`RotationConfig`] - Credential selection + streaming
//! - [`GeminiProvider`] - Streaming text provider backed by `genai`
//! - [`ApiKeyStatus`], [`KeyStatusStore`] - Per-key health tracking
//!
//! ## Maintenance
//! - [`ScriptRunner`] - Allow-listed admin command execution
//! - [`MaintenanceTask`] - Daily key reset + expired cache purge
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod admin;
pub mod cache;
pub mod config;
pub mod constants;
pub mod database;
pub mod hashing;
pub mod keys;
pub mod maintenance;
pub mod upstream;

pub use admin::{AdminError, SCRIPT_WHITELIST, ScriptOutput, ScriptRunner};
pub use cache::{
    CacheAccessor, CacheEntry, CacheError, CacheStatus, CacheStore, MemoryCacheStore,
    MongoCacheStore,
};
pub use config::{Config, ConfigError, StoreBackend};
pub use constants::{
    DEFAULT_CACHE_TTL_SECS, KEY_STATUS_COLLECTION, PCC_CACHE_COLLECTION, TWINCN_CACHE_COLLECTION,
};
pub use hashing::{fingerprint_secret, secrets_match};
#[cfg(any(test, feature = "mock"))]
pub use keys::{MockBehavior, MockTextProvider};
pub use keys::{
    ApiKeyStatus, GeminiProvider, HealthPolicy, KeyCredential, KeyHealth, KeyRotationError,
    KeyRotator, KeyStatusError, KeyStatusStore, KeyStrategy, MemoryKeyStatusStore,
    MongoKeyStatusStore, ProviderError, ProviderErrorKind, RotationConfig, RotationState,
    TextStream, TextStreamProvider,
};
pub use maintenance::{MaintenanceReport, MaintenanceTask};
pub use upstream::{UpstreamClient, UpstreamError};
