//! Key pool and rotation settings from the environment.

use std::env;
use std::time::Duration;

use super::types::{HealthPolicy, KeyCredential, KeyStrategy};
use crate::config::ConfigError;
use crate::constants::DEFAULT_GEMINI_MODEL;

/// Key pool, strategy and circuit-breaker settings.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Active environment type (`batch`, `production`, `development`, ...).
    pub env_type: String,
    /// Selection strategy.
    pub strategy: KeyStrategy,
    /// Credentials in priority order.
    pub keys: Vec<KeyCredential>,
    /// Model used for generation.
    pub model: String,
    /// Circuit-breaker thresholds.
    pub policy: HealthPolicy,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            env_type: "development".to_string(),
            strategy: KeyStrategy::Failover,
            keys: Vec::new(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            policy: HealthPolicy::default(),
        }
    }
}

impl RotationConfig {
    const ENV_TYPE: &'static str = "GEMINI_ENV_TYPE";
    const ENV_TYPE_FALLBACK: &'static str = "MAGNIFIER_ENV";
    const ENV_STRATEGY: &'static str = "NEXT_PUBLIC_GEMINI_KEY_STRATEGY";
    const ENV_MODEL: &'static str = "MAGNIFIER_GEMINI_MODEL";
    const ENV_FAILURE_THRESHOLD: &'static str = "MAGNIFIER_KEY_FAILURE_THRESHOLD";
    const ENV_COOLDOWN_SECS: &'static str = "MAGNIFIER_KEY_COOLDOWN_SECS";
    const ENV_DAILY_FAILURE_LIMIT: &'static str = "MAGNIFIER_KEY_DAILY_FAILURE_LIMIT";
    const KEY_VAR_PREFIX: &'static str = "NEXT_PUBLIC_GEMINI_API_KEY";

    /// Loads the pool for the active environment type.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let env_type = env::var(Self::ENV_TYPE)
            .or_else(|_| env::var(Self::ENV_TYPE_FALLBACK))
            .map(|v| v.trim().to_lowercase())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.env_type);

        let requested = match env::var(Self::ENV_STRATEGY) {
            Ok(value) if !value.trim().is_empty() => value
                .parse()
                .map_err(|_| ConfigError::InvalidKeyStrategy { value })?,
            _ => defaults.strategy,
        };
        let strategy = Self::effective_strategy(&env_type, requested);

        let keys = Self::pool_var_names(&env_type)
            .into_iter()
            .filter_map(|name| {
                let secret = env::var(&name).ok()?.trim().to_string();
                (!secret.is_empty()).then(|| KeyCredential::new(name, secret))
            })
            .collect();

        let model = env::var(Self::ENV_MODEL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.model);

        let policy = HealthPolicy {
            failure_threshold: Self::parse_u32(
                Self::ENV_FAILURE_THRESHOLD,
                defaults.policy.failure_threshold,
            )
            .max(1),
            cooldown: Duration::from_secs(Self::parse_u64(
                Self::ENV_COOLDOWN_SECS,
                defaults.policy.cooldown.as_secs(),
            )),
            daily_failure_limit: Self::parse_u32(
                Self::ENV_DAILY_FAILURE_LIMIT,
                defaults.policy.daily_failure_limit,
            )
            .max(1),
        };

        Ok(Self {
            env_type,
            strategy,
            keys,
            model,
            policy,
        })
    }

    /// Env var names holding the pool for `env_type`, primary first.
    pub fn pool_var_names(env_type: &str) -> [String; 2] {
        let pool = match env_type {
            "batch" => "BATCH",
            "production" => "PROD",
            _ => "DEV",
        };
        [
            format!("{}_{}_PRIMARY", Self::KEY_VAR_PREFIX, pool),
            format!("{}_{}_BACKUP", Self::KEY_VAR_PREFIX, pool),
        ]
    }

    /// Production always uses failover.
    pub fn effective_strategy(env_type: &str, requested: KeyStrategy) -> KeyStrategy {
        if env_type == "production" {
            KeyStrategy::Failover
        } else {
            requested
        }
    }

    fn parse_u32(var_name: &str, default: u32) -> u32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u64(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
