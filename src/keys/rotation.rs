//! Credential selection with health tracking.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use super::config::RotationConfig;
use super::error::{KeyRotationError, ProviderError};
use super::provider::TextStreamProvider;
use super::status::KeyStatusStore;
use super::types::{ApiKeyStatus, HealthPolicy, KeyCredential, KeyStrategy};

/// Round-robin cursor.
///
/// Advances once per request regardless of outcome. Lives for the process; separate
/// instances do not share it.
#[derive(Debug, Default)]
pub struct RotationState {
    cursor: AtomicUsize,
}

impl RotationState {
    /// Creates a cursor at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current position and advances by one.
    pub fn advance(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed)
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

/// Picks credentials per request and streams text through a [`TextStreamProvider`].
pub struct KeyRotator {
    keys: Vec<KeyCredential>,
    strategy: KeyStrategy,
    policy: HealthPolicy,
    env_type: String,
    provider: Arc<dyn TextStreamProvider>,
    store: Arc<dyn KeyStatusStore>,
    state: Arc<RotationState>,
}

impl std::fmt::Debug for KeyRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRotator")
            .field("keys", &self.keys)
            .field("strategy", &self.strategy)
            .field("env_type", &self.env_type)
            .finish_non_exhaustive()
    }
}

impl KeyRotator {
    /// Creates a rotator with its own [`RotationState`].
    pub fn new(
        config: RotationConfig,
        provider: Arc<dyn TextStreamProvider>,
        store: Arc<dyn KeyStatusStore>,
    ) -> Self {
        Self::with_state(config, provider, store, Arc::new(RotationState::new()))
    }

    /// Creates a rotator sharing an existing cursor.
    pub fn with_state(
        config: RotationConfig,
        provider: Arc<dyn TextStreamProvider>,
        store: Arc<dyn KeyStatusStore>,
        state: Arc<RotationState>,
    ) -> Self {
        Self {
            keys: config.keys,
            strategy: config.strategy,
            policy: config.policy,
            env_type: config.env_type,
            provider,
            store,
            state,
        }
    }

    /// Returns `true` if at least one key is configured.
    pub fn is_available(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Generates text for `prompt`, trying keys in strategy order.
    ///
    /// `on_text` receives the cumulative text after every delta. If a key fails with a
    /// retriable error the next key starts over, so the cumulative text may restart.
    pub async fn stream_generate<F>(
        &self,
        prompt: &str,
        mut on_text: F,
    ) -> Result<String, KeyRotationError>
    where
        F: FnMut(&str) + Send,
    {
        if self.keys.is_empty() {
            return Err(KeyRotationError::NoKeysConfigured {
                env_type: self.env_type.clone(),
            });
        }

        let now = Utc::now();
        let mut available = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let status = self.load_status(&key.identifier).await;
            match status {
                Some(ref s) if !s.is_available(now) => {
                    debug!(key = %key.identifier, retry_at = ?s.retry_at, "Skipping cooling-down key");
                }
                _ => available.push((key, status)),
            }
        }

        if available.is_empty() {
            warn!(configured = self.keys.len(), "No API keys available");
            return Err(KeyRotationError::NoKeysAvailable {
                configured: self.keys.len(),
            });
        }

        if self.strategy == KeyStrategy::RoundRobin {
            let start = self.state.advance() % available.len();
            available.rotate_left(start);
        }

        let mut attempted = 0usize;
        let mut last_error = None;
        for (key, status) in available {
            attempted += 1;
            info!(key = %key.identifier, strategy = %self.strategy, "Attempting generation");

            match self.attempt(key, prompt, &mut on_text).await {
                Ok(text) => {
                    self.record_success(key, status).await;
                    return Ok(text);
                }
                Err(e) => {
                    warn!(key = %key.identifier, kind = %e.kind, error = %e.message, "Generation failed");
                    self.record_failure(key, status, &e).await;

                    if !e.retriable() {
                        return Err(KeyRotationError::Aborted {
                            identifier: key.identifier.clone(),
                            source: e,
                        });
                    }
                    last_error = Some(e);
                }
            }
        }

        error!(attempted, "All available API keys failed");
        Err(KeyRotationError::AllKeysExhausted {
            attempted,
            last_error: last_error.unwrap_or_else(|| {
                ProviderError::classify("no key produced a response".to_string())
            }),
        })
    }

    async fn attempt<F>(
        &self,
        key: &KeyCredential,
        prompt: &str,
        on_text: &mut F,
    ) -> Result<String, ProviderError>
    where
        F: FnMut(&str) + Send,
    {
        let mut stream = self.provider.stream_text(key, prompt).await?;
        let mut text = String::new();

        while let Some(delta) = stream.next().await {
            let delta = delta?;
            if delta.is_empty() {
                continue;
            }
            text.push_str(&delta);
            on_text(&text);
        }

        Ok(text)
    }

    async fn load_status(&self, identifier: &str) -> Option<ApiKeyStatus> {
        match self.store.load(identifier).await {
            Ok(status) => status,
            Err(e) => {
                warn!(key = %identifier, error = %e, "Key status unavailable; treating key as healthy");
                None
            }
        }
    }

    async fn record_success(&self, key: &KeyCredential, status: Option<ApiKeyStatus>) {
        let now = Utc::now();
        let mut status = status.unwrap_or_else(|| ApiKeyStatus::new(&key.identifier, now));
        status.record_success(now);
        self.save(&status).await;
    }

    async fn record_failure(
        &self,
        key: &KeyCredential,
        status: Option<ApiKeyStatus>,
        error: &ProviderError,
    ) {
        let now = Utc::now();
        let mut status = status.unwrap_or_else(|| ApiKeyStatus::new(&key.identifier, now));
        if status.record_failure(now, &self.policy, error.kind, &error.message) {
            error!(
                key = %key.identifier,
                failures = status.failure_count,
                retry_at = ?status.retry_at,
                "API key degraded"
            );
        }
        self.save(&status).await;
    }

    async fn save(&self, status: &ApiKeyStatus) {
        if let Err(e) = self.store.save(status).await {
            warn!(key = %status.key_identifier, error = %e, "Failed to persist key status");
        }
    }
}
