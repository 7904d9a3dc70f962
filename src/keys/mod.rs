//! AI credential rotation.
//!
//! A [`KeyRotator`] holds the key pool of the active environment and, per request,
//! walks it in [`KeyStrategy`] order, skipping keys that are cooling down. Outcomes
//! feed a per-key circuit breaker persisted through a [`KeyStatusStore`].

/// Pool and strategy settings.
pub mod config;
/// Error types.
pub mod error;
/// Streaming provider seam + Gemini implementation.
pub mod provider;
/// Rotator + cursor.
pub mod rotation;
/// Health record persistence.
pub mod status;
/// Credential + health types.
pub mod types;

#[cfg(any(test, feature = "mock"))]
/// Scripted provider.
pub mod mock;


pub use config::RotationConfig;
pub use error::{KeyRotationError, KeyStatusError, ProviderError, ProviderErrorKind};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBehavior, MockTextProvider};
pub use provider::{GeminiProvider, TextStream, TextStreamProvider};
pub use rotation::{KeyRotator, RotationState};
pub use status::{KeyStatusStore, MemoryKeyStatusStore, MongoKeyStatusStore};
pub use types::{ApiKeyStatus, HealthPolicy, KeyCredential, KeyHealth, KeyStrategy, RecentError};
