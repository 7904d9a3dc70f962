//! HTTP gateway (Axum) for the portal backend: cached proxies, AI streaming, admin scripts.
//!
//! This module is primarily used by the `magnifier` server binary.

#![allow(missing_docs)]

pub mod admin;
pub mod company;
pub mod error;
pub mod state;
pub mod stream;
pub mod tender;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use admin::run_script_handler;
pub use company::twincn_handler;
pub use error::GatewayError;
pub use state::HandlerState;
pub use stream::gemini_stream_handler;
pub use tender::{tender_detail_handler, tender_search_handler};

/// Reports whether a proxy response came from the cache (`HIT`) or upstream (`MISS`).
pub const CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

/// Trimmed, non-empty parameter or a 400 carrying `message`.
pub fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, GatewayError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::invalid(message))
}

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/company/twincn", get(twincn_handler))
        .route("/api/tender-search-proxy", get(tender_search_handler))
        .route("/api/tender-detail-proxy", get(tender_detail_handler))
        .route("/api/gemini/stream", post(gemini_stream_handler))
        .route("/api/admin/run-script", post(run_script_handler))
        .fallback(not_found_handler)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %uuid::Uuid::new_v4(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub version: &'static str,
    pub database: &'static str,
}

#[tracing::instrument(skip(state))]
pub async fn health_handler(State(state): State<HandlerState>) -> Response {
    let db_ok = state.cache.is_healthy().await;

    let body = HealthResponse {
        status: if db_ok { "ok" } else { "degraded" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
        database: if db_ok { "connected" } else { "unreachable" },
    };

    (StatusCode::OK, Json(body)).into_response()
}

pub async fn not_found_handler() -> GatewayError {
    GatewayError::NotFound
}
