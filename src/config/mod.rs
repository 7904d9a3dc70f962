//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `MAGNIFIER_*` environment variables;
//! `MONGODB_URI` and `ADMIN_SECRET_TOKEN` keep their conventional names.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_DB_NAME};

/// Storage backend selection for the cache and key-status stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// MongoDB collections.
    #[default]
    Mongo,
    /// In-process memory (development and tests).
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(format!("Unknown store backend: {}", s)),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `3000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// MongoDB connection string. Default: `mongodb://localhost:27017`.
    pub mongodb_uri: String,

    /// Database holding the cache and key-status collections.
    pub database_name: String,

    /// Connection / server-selection timeout for the database. Default: 5s.
    pub db_timeout: Duration,

    /// Which store backend to use. Default: [`StoreBackend::Mongo`].
    pub store_backend: StoreBackend,

    /// Max entries held by the memory backend. Default: `10_000`.
    pub memory_capacity: u64,

    /// Proxy cache lifetime. Default: 24 hours.
    pub cache_ttl: Duration,

    /// Create a TTL index on `expiresAt` so MongoDB evicts stale entries itself.
    pub cache_ttl_index: bool,

    /// Company registry base URL. Default: `https://p.twincn.com`.
    pub twincn_base_url: String,

    /// Tender API base URL. Default: `https://pcc-api.openfun.app`.
    pub pcc_base_url: String,

    /// Bearer token guarding the admin script runner (`None` disables it).
    pub admin_secret_token: Option<String>,

    /// Command prefix used to run allow-listed scripts. Default: `npm run`.
    pub admin_script_command: Vec<String>,

    /// Working directory for admin scripts.
    pub admin_script_dir: Option<PathBuf>,
}

/// Default MongoDB URI used when `MONGODB_URI` is not set.
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
/// Default company registry base URL.
pub const DEFAULT_TWINCN_URL: &str = "https://p.twincn.com";
/// Default tender API base URL.
pub const DEFAULT_PCC_URL: &str = "https://pcc-api.openfun.app";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            mongodb_uri: DEFAULT_MONGODB_URI.to_string(),
            database_name: DEFAULT_DB_NAME.to_string(),
            db_timeout: Duration::from_secs(5),
            store_backend: StoreBackend::default(),
            memory_capacity: 10_000,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_ttl_index: true,
            twincn_base_url: DEFAULT_TWINCN_URL.to_string(),
            pcc_base_url: DEFAULT_PCC_URL.to_string(),
            admin_secret_token: None,
            admin_script_command: vec!["npm".to_string(), "run".to_string()],
            admin_script_dir: None,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "MAGNIFIER_PORT";
    const ENV_BIND_ADDR: &'static str = "MAGNIFIER_BIND_ADDR";
    const ENV_MONGODB_URI: &'static str = "MONGODB_URI";
    const ENV_DB_NAME: &'static str = "MAGNIFIER_DB_NAME";
    const ENV_DB_TIMEOUT_SECS: &'static str = "MAGNIFIER_DB_TIMEOUT_SECS";
    const ENV_STORE_BACKEND: &'static str = "MAGNIFIER_STORE_BACKEND";
    const ENV_MEMORY_CAPACITY: &'static str = "MAGNIFIER_MEMORY_CAPACITY";
    const ENV_CACHE_TTL_SECS: &'static str = "MAGNIFIER_CACHE_TTL_SECS";
    const ENV_CACHE_TTL_INDEX: &'static str = "MAGNIFIER_CACHE_TTL_INDEX";
    const ENV_TWINCN_URL: &'static str = "MAGNIFIER_TWINCN_URL";
    const ENV_PCC_URL: &'static str = "MAGNIFIER_PCC_URL";
    const ENV_ADMIN_SECRET_TOKEN: &'static str = "ADMIN_SECRET_TOKEN";
    const ENV_ADMIN_SCRIPT_COMMAND: &'static str = "MAGNIFIER_ADMIN_SCRIPT_COMMAND";
    const ENV_ADMIN_SCRIPT_DIR: &'static str = "MAGNIFIER_ADMIN_SCRIPT_DIR";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let mongodb_uri = Self::parse_string_from_env(Self::ENV_MONGODB_URI, defaults.mongodb_uri);
        let database_name = Self::parse_string_from_env(Self::ENV_DB_NAME, defaults.database_name);
        let db_timeout = Duration::from_secs(Self::parse_u64_from_env(
            Self::ENV_DB_TIMEOUT_SECS,
            defaults.db_timeout.as_secs(),
        ));
        let store_backend = Self::parse_backend_from_env(defaults.store_backend)?;
        let memory_capacity =
            Self::parse_u64_from_env(Self::ENV_MEMORY_CAPACITY, defaults.memory_capacity);
        let cache_ttl = Duration::from_secs(Self::parse_u64_from_env(
            Self::ENV_CACHE_TTL_SECS,
            defaults.cache_ttl.as_secs(),
        ));
        let cache_ttl_index =
            Self::parse_bool_from_env(Self::ENV_CACHE_TTL_INDEX, defaults.cache_ttl_index);
        let twincn_base_url =
            Self::parse_string_from_env(Self::ENV_TWINCN_URL, defaults.twincn_base_url);
        let pcc_base_url = Self::parse_string_from_env(Self::ENV_PCC_URL, defaults.pcc_base_url);
        let admin_secret_token = Self::parse_optional_string_from_env(Self::ENV_ADMIN_SECRET_TOKEN);
        let admin_script_command = Self::parse_optional_string_from_env(
            Self::ENV_ADMIN_SCRIPT_COMMAND,
        )
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or(defaults.admin_script_command);
        let admin_script_dir =
            Self::parse_optional_string_from_env(Self::ENV_ADMIN_SCRIPT_DIR).map(PathBuf::from);

        Ok(Self {
            port,
            bind_addr,
            mongodb_uri,
            database_name,
            db_timeout,
            store_backend,
            memory_capacity,
            cache_ttl,
            cache_ttl_index,
            twincn_base_url,
            pcc_base_url,
            admin_secret_token,
            admin_script_command,
            admin_script_dir,
        })
    }

    /// Validates basic invariants (does not touch the network).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let uri = self.mongodb_uri.as_str();
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(ConfigError::InvalidMongoUri {
                value: self.mongodb_uri.clone(),
            });
        }

        for (name, value) in [
            (Self::ENV_TWINCN_URL, &self.twincn_base_url),
            (Self::ENV_PCC_URL, &self.pcc_base_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
                name,
                value: value.clone(),
                source: e,
            })?;
        }

        if self.admin_script_command.is_empty() {
            return Err(ConfigError::EmptyScriptCommand);
        }

        if let Some(ref path) = self.admin_script_dir {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Returns `true` if the admin script runner can accept requests.
    pub fn admin_enabled(&self) -> bool {
        self.admin_secret_token.is_some()
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_backend_from_env(default: StoreBackend) -> Result<StoreBackend, ConfigError> {
        match env::var(Self::ENV_STORE_BACKEND) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidStoreBackend { value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .map(|s| s != "false" && s != "0")
            .unwrap_or(default)
    }
}
