use std::convert::Infallible;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::sse::{Event, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use super::error::GatewayError;
use super::state::HandlerState;

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    pub prompt: Option<String>,
}

pub fn text_event(text: &str) -> Event {
    Event::default().data(serde_json::json!({ "text": text }).to_string())
}

pub fn close_event() -> Event {
    Event::default().data(serde_json::json!({ "event": "close" }).to_string())
}

pub fn error_event(message: &str) -> Event {
    Event::default().data(serde_json::json!({ "error": message }).to_string())
}

/// `POST /api/gemini/stream` with `{prompt}`.
///
/// Emits `{"text": <cumulative>}` events, then `{"event":"close"}` on success or
/// `{"error": ...}` when no key produced a response. Generation runs in its own task;
/// once the client goes away events are dropped.
#[tracing::instrument(skip(state, payload))]
pub async fn gemini_stream_handler(
    State(state): State<HandlerState>,
    payload: Result<Json<StreamRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>, GatewayError> {
    let Json(request) = payload.map_err(|_| GatewayError::invalid("Invalid request body"))?;
    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| GatewayError::invalid("Missing prompt parameter"))?;

    info!(prompt_chars = prompt.chars().count(), "Starting generation");

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let rotator = state.rotator.clone();

    tokio::spawn(async move {
        let chunk_tx = tx.clone();
        let result = rotator
            .stream_generate(&prompt, move |text| {
                let _ = chunk_tx.send(text_event(text));
            })
            .await;

        let last = match result {
            Ok(text) => {
                info!(chars = text.chars().count(), "Generation complete");
                close_event()
            }
            Err(e) => {
                warn!(error = %e, "Generation failed");
                error_event(&e.to_string())
            }
        };
        let _ = tx.send(last);
    });

    Ok(Sse::new(UnboundedReceiverStream::new(rx).map(Ok)))
}
