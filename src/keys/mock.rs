//! Scripted provider for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;

use super::error::ProviderError;
use super::provider::{TextStream, TextStreamProvider};
use super::types::KeyCredential;

/// What the mock does when a given credential is used.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Stream these deltas, then finish.
    Reply(Vec<String>),
    /// Fail before streaming.
    Fail(ProviderError),
    /// Stream `chunks`, then yield `error`.
    FailMidStream {
        /// Deltas sent before the failure.
        chunks: Vec<String>,
        /// Error yielded after the chunks.
        error: ProviderError,
    },
}

/// [`TextStreamProvider`] whose behaviour is scripted per credential identifier.
///
/// Unscripted credentials reply with `"ok"`. Every call is recorded.
#[derive(Debug, Default)]
pub struct MockTextProvider {
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    calls: Mutex<Vec<String>>,
}

impl MockTextProvider {
    /// Creates a provider with no scripted behaviours.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the behaviour for `identifier`.
    pub fn set_behavior(&self, identifier: impl Into<String>, behavior: MockBehavior) {
        self.behaviors.lock().insert(identifier.into(), behavior);
    }

    /// Builder form of [`MockTextProvider::set_behavior`].
    pub fn with_behavior(self, identifier: impl Into<String>, behavior: MockBehavior) -> Self {
        self.set_behavior(identifier, behavior);
        self
    }

    /// Identifiers used, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls made with `identifier`.
    pub fn call_count(&self, identifier: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == identifier).count()
    }
}

#[async_trait]
impl TextStreamProvider for MockTextProvider {
    async fn stream_text(
        &self,
        credential: &KeyCredential,
        _prompt: &str,
    ) -> Result<TextStream, ProviderError> {
        self.calls.lock().push(credential.identifier.clone());

        let behavior = self
            .behaviors
            .lock()
            .get(&credential.identifier)
            .cloned()
            .unwrap_or_else(|| MockBehavior::Reply(vec!["ok".to_string()]));

        match behavior {
            MockBehavior::Reply(chunks) => {
                Ok(futures_util::stream::iter(chunks.into_iter().map(Ok)).boxed())
            }
            MockBehavior::Fail(error) => Err(error),
            MockBehavior::FailMidStream { chunks, error } => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(error)));
                Ok(futures_util::stream::iter(items).boxed())
            }
        }
    }
}
