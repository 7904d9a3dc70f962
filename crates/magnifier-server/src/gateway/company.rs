use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;

use magnifier::constants::TWINCN_CACHE_COLLECTION;
use magnifier::upstream::UpstreamClient;

use super::error::GatewayError;
use super::state::HandlerState;
use super::{CACHE_STATUS, required};

#[derive(Debug, Deserialize)]
pub struct CompanyQuery {
    pub no: Option<String>,
}

/// `GET /api/company/twincn?no=<taxId>`: company registry page (HTML), cached.
#[tracing::instrument(skip(state, query))]
pub async fn twincn_handler(
    State(state): State<HandlerState>,
    query: Result<Query<CompanyQuery>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let Query(query) = query.map_err(|e| GatewayError::invalid(e.body_text()))?;
    let tax_id = required(query.no.as_deref(), "Missing required parameter: no")?;

    let url = state
        .upstream
        .company_page_url(tax_id)
        .map_err(|e| GatewayError::internal("Failed to build upstream URL", e))?;
    let key = UpstreamClient::company_cache_key(tax_id);

    let upstream = &state.upstream;
    let (value, status) = state
        .cache
        .get_or_fetch(TWINCN_CACHE_COLLECTION, &key, state.cache_ttl, || async move {
            upstream.fetch_html(&url).await.map(Value::String)
        })
        .await
        .map_err(|e| GatewayError::upstream("Failed to fetch company page", e))?;

    let html = match value {
        Value::String(html) => html,
        other => other.to_string(),
    };

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
            (
                CACHE_STATUS,
                HeaderValue::from_static(status.as_header_value()),
            ),
        ],
        html,
    )
        .into_response())
}
