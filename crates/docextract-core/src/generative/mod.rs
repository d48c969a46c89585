//! Generative-text backends used by the structured extraction stage.
//!
//! Both conversation-style (thread/run) and single-shot (messages) backends
//! sit behind [`GenerativeBackend`]: given a prompt, return free-form text.

pub mod anthropic;
#[cfg(test)]
pub(crate) mod mock;
pub mod openai;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::ProviderError;

/// System instruction sent with every single-shot request.
pub const SYSTEM_INSTRUCTION: &str = "You are a financial analyst specialized in parsing structured transaction data. Return ONLY valid JSON without any additional text.";

/// Reply of a generative backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    /// The backend's native response, untouched.
    #[serde(rename = "rawResponse")]
    pub raw_response: Value,
}

pub trait GenerativeBackend: Send + Sync {
    /// Short identifier used in error messages (`anthropic`, `openai`).
    fn name(&self) -> &str;

    /// Send one prompt and return the model's reply. Exactly one logical
    /// request per call; no retries.
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, ProviderError>> + Send + 'a>>;
}

/// Which generative backend to build from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerativeKind {
    Anthropic,
    OpenAi,
}

impl GenerativeKind {
    pub const ALL: [GenerativeKind; 2] = [GenerativeKind::Anthropic, GenerativeKind::OpenAi];

    pub fn name(&self) -> &'static str {
        match self {
            GenerativeKind::Anthropic => "anthropic",
            GenerativeKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for GenerativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GenerativeKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(GenerativeKind::Anthropic),
            "openai" => Ok(GenerativeKind::OpenAi),
            _ => Err(ProviderError::Input(format!(
                "unknown generative backend {s:?} (expected anthropic or openai)"
            ))),
        }
    }
}
