use std::convert::Infallible;

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use magnifier::admin::{AdminError, ScriptRunner};
use magnifier::hashing::{fingerprint_secret, secrets_match};

use super::error::GatewayError;
use super::state::HandlerState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScriptRequest {
    pub script_name: Option<String>,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `POST /api/admin/run-script` with `{scriptName}` and a bearer token.
///
/// Allow-list first (400), then token (401), then spawn. Output is streamed as
/// `text/plain`.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn run_script_handler(
    State(state): State<HandlerState>,
    headers: HeaderMap,
    payload: Result<Json<RunScriptRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let script = payload
        .ok()
        .and_then(|Json(r)| r.script_name)
        .unwrap_or_default();

    if !ScriptRunner::is_allowed(&script) {
        warn!(script = %script, "Rejected script outside allow-list");
        return Err(GatewayError::invalid("Invalid or unauthorized script"));
    }

    let presented = bearer_token(&headers).ok_or(GatewayError::Unauthorized)?;
    let Some(expected) = state.admin_token.as_deref() else {
        warn!("Admin request rejected: no admin token configured");
        return Err(GatewayError::Unauthorized);
    };
    if !secrets_match(presented, expected) {
        warn!(token = %fingerprint_secret(presented), "Admin request rejected: bad token");
        return Err(GatewayError::Unauthorized);
    }

    let output = state.scripts.run(&script).map_err(|e| match e {
        AdminError::UnknownScript { .. } => GatewayError::invalid("Invalid or unauthorized script"),
        other => GatewayError::internal("Failed to execute script", other),
    })?;
    info!(script = %script, "Streaming admin script output");

    let body = Body::from_stream(output.into_stream().map(Ok::<_, Infallible>));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        body,
    )
        .into_response())
}
