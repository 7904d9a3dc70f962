//! Test server harness.

use magnifier::admin::ScriptRunner;
use magnifier::cache::{CacheAccessor, MemoryCacheStore};
use magnifier::keys::{
    KeyCredential, KeyRotator, KeyStrategy, MemoryKeyStatusStore, MockTextProvider,
    RotationConfig,
};
use magnifier::upstream::UpstreamClient;
use magnifier_server::gateway::{HandlerState, create_router_with_state};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub const TEST_ADMIN_TOKEN: &str = "harness-admin-token";

#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub port: u16,
    /// Base URL used for both the company registry and the tender API.
    pub upstream_url: String,
    pub cache_ttl: Duration,
    pub keys: Vec<String>,
    pub strategy: KeyStrategy,
    /// Passed to `sh -c`; the script name arrives as `$0`.
    pub script: String,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            upstream_url: "http://127.0.0.1:1".to_string(),
            cache_ttl: Duration::from_secs(60),
            keys: vec!["KEY_A".to_string(), "KEY_B".to_string()],
            strategy: KeyStrategy::Failover,
            script: "echo running $0".to_string(),
        }
    }
}

impl TestServerConfig {
    pub fn with_upstream(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub provider: Arc<MockTextProvider>,
    pub cache: CacheAccessor,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    script_dir: TempDir,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Working directory of admin scripts.
    pub fn script_dir(&self) -> &Path {
        self.script_dir.path()
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn find_available_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    Ok(addr.port())
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// Spawns a server with every external dependency replaced:
/// - **Cache**: in-memory store
/// - **Key status**: in-memory store
/// - **AI provider**: [`MockTextProvider`], reachable through [`TestServer::provider`]
/// - **Admin scripts**: `sh -c <config.script>` in a temp directory
///
/// Upstreams point at `config.upstream_url` (usually a wiremock server).
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let port = if config.port == 0 {
        find_available_port().await?
    } else {
        config.port
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let script_dir = TempDir::new().map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let upstream = UpstreamClient::new(&config.upstream_url, &config.upstream_url)
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let cache = CacheAccessor::new(Arc::new(MemoryCacheStore::new()));
    let provider = Arc::new(MockTextProvider::new());

    let rotation = RotationConfig {
        strategy: config.strategy,
        keys: config
            .keys
            .iter()
            .map(|id| KeyCredential::new(id.as_str(), format!("secret-{id}")))
            .collect(),
        ..Default::default()
    };
    let rotator = Arc::new(KeyRotator::new(
        rotation,
        provider.clone(),
        Arc::new(MemoryKeyStatusStore::new()),
    ));

    let scripts = Arc::new(ScriptRunner::new(
        vec!["sh".to_string(), "-c".to_string(), config.script.clone()],
        Some(script_dir.path().to_path_buf()),
    ));

    let state = HandlerState::new(cache.clone(), upstream, rotator, scripts)
        .with_admin_token(Some(TEST_ADMIN_TOKEN.to_string()))
        .with_cache_ttl(config.cache_ttl);

    let app = create_router_with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        provider,
        cache,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
        script_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_available_port() {
        let port = find_available_port()
            .await
            .expect("Should find available port");
        assert!(port > 0);
    }

    #[tokio::test]
    async fn test_server_config_defaults() {
        let config = TestServerConfig::default();
        assert_eq!(config.port, 0);
        assert_eq!(config.keys.len(), 2);
        assert_eq!(config.strategy, KeyStrategy::Failover);
    }
}
