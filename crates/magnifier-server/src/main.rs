//! Business Magnifier HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use magnifier::admin::ScriptRunner;
use magnifier::cache::{CacheAccessor, CacheStore, MemoryCacheStore, MongoCacheStore};
use magnifier::config::{Config, StoreBackend};
use magnifier::constants::CACHE_COLLECTIONS;
use magnifier::database;
use magnifier::keys::{
    GeminiProvider, KeyRotator, KeyStatusStore, MemoryKeyStatusStore, MongoKeyStatusStore,
    RotationConfig,
};
use magnifier::maintenance::MaintenanceTask;
use magnifier::upstream::UpstreamClient;
use magnifier_server::gateway::{HandlerState, create_router_with_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check(health_check_port()).await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        backend = ?config.store_backend,
        "Business Magnifier starting"
    );

    let rotation = RotationConfig::from_env()?;
    if rotation.keys.is_empty() {
        tracing::warn!(
            env_type = %rotation.env_type,
            "No Gemini API keys configured; /api/gemini/stream will report errors"
        );
    } else {
        tracing::info!(
            env_type = %rotation.env_type,
            strategy = %rotation.strategy,
            keys = rotation.keys.len(),
            model = %rotation.model,
            "Gemini key rotation configured"
        );
    }

    let (cache_store, key_statuses) = open_stores(&config).await?;

    let cache = CacheAccessor::new(cache_store);
    cache.ensure_indexes(&CACHE_COLLECTIONS).await;
    if let Err(e) = key_statuses.ensure_indexes().await {
        tracing::warn!(error = %e, "Failed to create key status indexes");
    }

    let maintenance = MaintenanceTask::new(cache.clone(), key_statuses.clone()).spawn();

    let provider = Arc::new(GeminiProvider::new(rotation.model.clone()));
    let rotator = Arc::new(KeyRotator::new(rotation, provider, key_statuses));

    let upstream = UpstreamClient::from_config(&config)?;
    let scripts = Arc::new(ScriptRunner::from_config(&config));
    if !config.admin_enabled() {
        tracing::warn!("ADMIN_SECRET_TOKEN not set; admin script runner rejects all requests");
    }

    let state = HandlerState::new(cache, upstream, rotator, scripts)
        .with_admin_token(config.admin_secret_token.clone())
        .with_cache_ttl(config.cache_ttl);

    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    maintenance.abort();
    tracing::info!("Business Magnifier shutdown complete");
    Ok(())
}

async fn open_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn CacheStore>, Arc<dyn KeyStatusStore>)> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let db = database::open(config).await?;
            if let Err(e) = database::ping(&db).await {
                tracing::warn!(
                    error = %e,
                    "MongoDB unreachable at startup; requests will bypass the cache until it recovers"
                );
            }
            let key_statuses = Arc::new(MongoKeyStatusStore::new(&db));
            let cache = Arc::new(MongoCacheStore::new(db, config.cache_ttl_index));
            Ok((cache, key_statuses))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; cache and key health are lost on restart");
            Ok((
                Arc::new(MemoryCacheStore::with_capacity(config.memory_capacity)),
                Arc::new(MemoryKeyStatusStore::new()),
            ))
        }
    }
}

fn health_check_port() -> u16 {
    std::env::var("MAGNIFIER_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000)
}

/// Calls the local `/api/health`; `0` on a success status, `1` otherwise.
async fn run_health_check(port: u16) -> i32 {
    let url = format!("http://127.0.0.1:{}/api/health", port);

    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    else {
        return 1;
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
