//! Scripted generative backend for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::{Completion, GenerativeBackend};
use crate::error::ProviderError;

/// Replies with scripted text in order, repeating the last reply once the
/// script runs out. Records every prompt it receives.
pub struct MockGenerative {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    fallback: Result<String, ProviderError>,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockGenerative {
    /// Always reply with `text`.
    pub fn reply(text: impl Into<String>) -> Self {
        Self::with_sequence(vec![Ok(text.into())])
    }

    /// Always fail with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::with_sequence(vec![Err(error)])
    }

    pub fn with_sequence(mut replies: Vec<Result<String, ProviderError>>) -> Self {
        let fallback = replies.last().cloned().unwrap_or_else(|| Ok(String::new()));
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            fallback,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl GenerativeBackend for MockGenerative {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, ProviderError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .unwrap_or_else(|| self.fallback.clone());

        Box::pin(async move {
            let text = reply?;
            Ok(Completion {
                raw_response: json!({ "mock": true, "text": text }),
                text,
            })
        })
    }
}
