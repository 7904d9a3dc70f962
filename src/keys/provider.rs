//! Streaming text generation providers.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, ModelIden};
use tracing::{debug, info};

use super::error::ProviderError;
use super::types::KeyCredential;
use crate::constants::DEFAULT_GEMINI_MODEL;

/// Stream of text deltas (not cumulative).
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

#[async_trait]
/// Opens a streaming generation with one specific credential.
pub trait TextStreamProvider: Send + Sync {
    /// Starts generating `prompt` with `credential`.
    ///
    /// Errors before the first chunk are returned directly; errors after that are
    /// yielded by the stream.
    async fn stream_text(
        &self,
        credential: &KeyCredential,
        prompt: &str,
    ) -> Result<TextStream, ProviderError>;
}

/// Gemini provider backed by `genai`.
///
/// Builds a client per call whose auth resolver returns the given credential, so a
/// single provider serves every key in the pool.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    model: String,
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new(DEFAULT_GEMINI_MODEL)
    }
}

impl GeminiProvider {
    /// Creates a provider for `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    fn client_for(credential: &KeyCredential) -> Client {
        let secret = credential.secret.clone();
        let resolver = AuthResolver::from_resolver_fn(
            move |_model: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(secret.clone())))
            },
        );
        Client::builder().with_auth_resolver(resolver).build()
    }
}

#[async_trait]
impl TextStreamProvider for GeminiProvider {
    async fn stream_text(
        &self,
        credential: &KeyCredential,
        prompt: &str,
    ) -> Result<TextStream, ProviderError> {
        let client = Self::client_for(credential);
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        let options = ChatOptions::default().with_capture_usage(true);

        debug!(key = %credential.identifier, model = %self.model, "Opening Gemini stream");
        let response = client
            .exec_chat_stream(&self.model, request, Some(&options))
            .await
            .map_err(|e| ProviderError::classify(e.to_string()))?;

        let identifier = credential.identifier.clone();
        let stream = response.stream.filter_map(move |event| {
            let item = match event {
                Ok(ChatStreamEvent::Chunk(chunk)) if !chunk.content.is_empty() => {
                    Some(Ok(chunk.content))
                }
                Ok(ChatStreamEvent::End(end)) => {
                    if let Some(usage) = end.captured_usage {
                        info!(
                            key = %identifier,
                            input_tokens = usage.prompt_tokens.unwrap_or(0),
                            output_tokens = usage.completion_tokens.unwrap_or(0),
                            total_tokens = usage.total_tokens.unwrap_or(0),
                            "Gemini token usage"
                        );
                    }
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(ProviderError::classify(e.to_string()))),
            };
            std::future::ready(item)
        });

        Ok(stream.boxed())
    }
}
