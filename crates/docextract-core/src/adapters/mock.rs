//! Mock provider adapter for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::ProviderAdapter;
use crate::document::validate_document;
use crate::error::ProviderError;
use crate::provider::Provider;
use crate::ExtractionResult;

/// A configurable mock response for [`MockAdapter`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Succeed with this text; the raw response echoes it.
    Text(String),
    /// Fail with this error.
    Error(ProviderError),
}

/// A hand-rolled mock implementing [`ProviderAdapter`] for tests.
///
/// Supports:
/// - A fixed response (used for every call), **or**
/// - A sequence of responses (one per call, repeating the last if exhausted).
/// - Call counting via [`call_count()`](MockAdapter::call_count).
///
/// Documents are validated like a real adapter, so invalid input never
/// reaches the scripted response (but still counts as a call).
pub struct MockAdapter {
    provider: Provider,
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    call_count: AtomicUsize,
}

impl MockAdapter {
    /// Create a mock that always returns `response`.
    pub fn new(provider: Provider, response: MockResponse) -> Self {
        Self {
            provider,
            responses: Mutex::new(Vec::new()),
            fallback: response,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Shorthand for a mock that always succeeds with `text`.
    pub fn text(provider: Provider, text: impl Into<String>) -> Self {
        Self::new(provider, MockResponse::Text(text.into()))
    }

    /// Create a mock that returns responses in order, repeating the last one.
    /// An empty sequence behaves like an always-empty-text mock.
    pub fn with_sequence(provider: Provider, mut responses: Vec<MockResponse>) -> Self {
        let fallback = responses
            .last()
            .cloned()
            .unwrap_or_else(|| MockResponse::Text(String::new()));
        // Reverse so we can pop() from the front cheaply.
        responses.reverse();
        Self {
            provider,
            responses: Mutex::new(responses),
            fallback,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `analyze()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        let mut seq = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl ProviderAdapter for MockAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ExtractionResult, ProviderError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();

        Box::pin(async move {
            validate_document(document, 0)?;
            match response {
                MockResponse::Text(text) => Ok(ExtractionResult {
                    raw_response: json!({ "mock": self.provider.name(), "text": text }),
                    text,
                }),
                MockResponse::Error(e) => Err(e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_then_repeat_last() {
        let mock = MockAdapter::with_sequence(
            Provider::Azure,
            vec![
                MockResponse::Error(ProviderError::Upstream("busy".into())),
                MockResponse::Text("ok".into()),
            ],
        );
        assert!(mock.analyze(b"%PDF-1").await.is_err());
        assert_eq!(mock.analyze(b"%PDF-1").await.unwrap().text, "ok");
        assert_eq!(mock.analyze(b"%PDF-1").await.unwrap().text, "ok");
        assert_eq!(mock.call_count(), 3);
    }
}
