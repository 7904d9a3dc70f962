use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use url::Url;

use magnifier::cache::CacheStatus;
use magnifier::constants::PCC_CACHE_COLLECTION;

use super::error::GatewayError;
use super::state::HandlerState;
use super::{CACHE_STATUS, required};

#[derive(Debug, Deserialize)]
pub struct TenderSearchQuery {
    #[serde(rename = "taxId")]
    pub tax_id: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TenderDetailQuery {
    pub unit_id: Option<String>,
    pub job_number: Option<String>,
}

/// Parses `page` (default 1). Must be a positive integer.
pub fn parse_page(raw: Option<&str>) -> Result<u32, GatewayError> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(1),
        Some(p) => match p.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(GatewayError::invalid(format!(
                "Invalid page parameter: {p} (expected a positive integer)"
            ))),
        },
    }
}

/// `GET /api/tender-search-proxy?taxId=<id>&page=<n>`
#[tracing::instrument(skip(state, query))]
pub async fn tender_search_handler(
    State(state): State<HandlerState>,
    query: Result<Query<TenderSearchQuery>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let Query(query) = query.map_err(|e| GatewayError::invalid(e.body_text()))?;
    let tax_id = required(query.tax_id.as_deref(), "Missing taxId parameter")?;
    let page = parse_page(query.page.as_deref())?;

    let url = state
        .upstream
        .tender_search_url(tax_id, page)
        .map_err(|e| GatewayError::internal("Failed to build upstream URL", e))?;

    proxy_json(&state, url, "Failed to fetch tender search data").await
}

/// `GET /api/tender-detail-proxy?unit_id=<id>&job_number=<n>`
#[tracing::instrument(skip(state, query))]
pub async fn tender_detail_handler(
    State(state): State<HandlerState>,
    query: Result<Query<TenderDetailQuery>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let Query(query) = query.map_err(|e| GatewayError::invalid(e.body_text()))?;
    const MISSING: &str = "Missing unit_id or job_number parameter";
    let unit_id = required(query.unit_id.as_deref(), MISSING)?;
    let job_number = required(query.job_number.as_deref(), MISSING)?;

    let url = state
        .upstream
        .tender_detail_url(unit_id, job_number)
        .map_err(|e| GatewayError::internal("Failed to build upstream URL", e))?;

    proxy_json(&state, url, "Failed to fetch tender detail data").await
}

// Cache key is the upstream URL.
async fn proxy_json(
    state: &HandlerState,
    url: Url,
    failure: &'static str,
) -> Result<Response, GatewayError> {
    let upstream = &state.upstream;
    let target = &url;
    let (value, status): (_, CacheStatus) = state
        .cache
        .get_or_fetch(PCC_CACHE_COLLECTION, url.as_str(), state.cache_ttl, || async move {
            upstream.fetch_json(target).await
        })
        .await
        .map_err(|e| GatewayError::upstream(failure, e))?;

    Ok((
        [(
            CACHE_STATUS,
            HeaderValue::from_static(status.as_header_value()),
        )],
        Json(value),
    )
        .into_response())
}
