use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ProviderErrorKind;
use crate::constants::MAX_RECENT_ERRORS;

/// An AI provider credential.
///
/// `identifier` is the environment variable name the secret was read from; it is the
/// stable id used for health tracking and logging. The secret itself is never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyCredential {
    /// Stable identifier (env var name).
    pub identifier: String,
    /// API key value.
    pub secret: String,
}

impl KeyCredential {
    /// Creates a credential.
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for KeyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCredential")
            .field("identifier", &self.identifier)
            .field("secret", &crate::hashing::fingerprint_secret(&self.secret))
            .finish()
    }
}

/// Health of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyHealth {
    /// Usable.
    #[default]
    Healthy,
    /// Skipped until `retryAt`.
    #[serde(alias = "UNHEALTHY")]
    Degraded,
}

impl KeyHealth {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyHealth::Healthy => "HEALTHY",
            KeyHealth::Degraded => "DEGRADED",
        }
    }
}

/// How credentials are chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Fixed priority order; fall through to the next key on failure.
    #[default]
    Failover,
    /// Start at a rotating cursor; fall through the remaining keys on failure.
    RoundRobin,
}

impl std::str::FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failover" => Ok(Self::Failover),
            "round-robin" | "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            _ => Err(format!("Unknown key strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyStrategy::Failover => write!(f, "failover"),
            KeyStrategy::RoundRobin => write!(f, "round-robin"),
        }
    }
}

/// Circuit-breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Consecutive failures before a key is degraded.
    pub failure_threshold: u32,
    /// How long a degraded key is skipped.
    pub cooldown: Duration,
    /// Failures within a day before a key is degraded.
    pub daily_failure_limit: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(5 * 60),
            daily_failure_limit: 20,
        }
    }
}

/// One entry of a credential's recent error history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentError {
    /// Classified error kind.
    pub error_type: String,
    /// Provider message.
    pub error_message: String,
    /// When the error was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Persisted health record of one credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    /// Credential identifier (unique).
    pub key_identifier: String,
    /// Current health.
    pub status: KeyHealth,
    /// Consecutive failures since the last success.
    pub failure_count: u32,
    /// Failures since the last daily reset.
    pub daily_failure_count: u32,
    /// Last time the record changed.
    pub last_checked_at: DateTime<Utc>,
    /// Earliest time a degraded key may be used again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<DateTime<Utc>>,
    /// Most recent errors, oldest first.
    #[serde(default)]
    pub recent_errors: Vec<RecentError>,
}

impl ApiKeyStatus {
    /// A fresh healthy record.
    pub fn new(identifier: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key_identifier: identifier.into(),
            status: KeyHealth::Healthy,
            failure_count: 0,
            daily_failure_count: 0,
            last_checked_at: now,
            retry_at: None,
            recent_errors: Vec::new(),
        }
    }

    /// Returns `false` only for a degraded key whose `retry_at` is still in the future.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.retry_at) {
            (KeyHealth::Degraded, Some(retry_at)) => now >= retry_at,
            _ => true,
        }
    }

    /// Records a failed call, degrading the key once a threshold is reached.
    ///
    /// Returns `true` if this failure transitioned the key to [`KeyHealth::Degraded`].
    pub fn record_failure(
        &mut self,
        now: DateTime<Utc>,
        policy: &HealthPolicy,
        kind: ProviderErrorKind,
        message: &str,
    ) -> bool {
        self.failure_count = self.failure_count.saturating_add(1);
        self.daily_failure_count = self.daily_failure_count.saturating_add(1);
        self.last_checked_at = now;

        self.recent_errors.push(RecentError {
            error_type: kind.as_str().to_string(),
            error_message: message.to_string(),
            timestamp: now,
        });
        if self.recent_errors.len() > MAX_RECENT_ERRORS {
            let excess = self.recent_errors.len() - MAX_RECENT_ERRORS;
            self.recent_errors.drain(..excess);
        }

        let tripped = self.failure_count >= policy.failure_threshold
            || self.daily_failure_count >= policy.daily_failure_limit;
        if !tripped {
            return false;
        }

        let cooldown = chrono::Duration::from_std(policy.cooldown).unwrap_or(chrono::Duration::MAX);
        self.retry_at = Some(now.checked_add_signed(cooldown).unwrap_or(DateTime::<Utc>::MAX_UTC));
        let was_healthy = self.status == KeyHealth::Healthy;
        self.status = KeyHealth::Degraded;
        was_healthy
    }

    /// Records a successful call.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.status = KeyHealth::Healthy;
        self.failure_count = 0;
        self.retry_at = None;
        self.last_checked_at = now;
    }

    /// Daily reset: healthy, zeroed counters, no `retry_at`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.status = KeyHealth::Healthy;
        self.failure_count = 0;
        self.daily_failure_count = 0;
        self.retry_at = None;
        self.last_checked_at = now;
    }
}
