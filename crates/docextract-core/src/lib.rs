use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod adapters;
pub mod backend;
pub mod config_file;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod generative;
pub mod http;
pub mod poll;
pub mod provider;
pub mod schema;
pub mod structured;

// Re-export for convenience
pub use adapters::adobe::AdobeConfig;
pub use adapters::amazon::AmazonConfig;
pub use adapters::azure::AzureConfig;
pub use adapters::google::GoogleConfig;
pub use adapters::{AdapterSettings, ProviderAdapter};
pub use backend::{BackendError, ParsedPdf, PdfBackend};
pub use dispatcher::ExtractionDispatcher;
pub use error::{ErrorKind, ExtractError, ProviderError, StructuredError};
pub use generative::anthropic::AnthropicConfig;
pub use generative::openai::OpenAiConfig;
pub use generative::{Completion, GenerativeBackend, GenerativeKind};
pub use poll::{CompletionWaiter, JobHandle, JobStatus};
pub use provider::Provider;
pub use structured::StructuredExtractor;

/// Uniform envelope returned by every provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Flattened, newline-joined text. Always present, possibly empty.
    pub text: String,
    /// The provider's native response, for inspection only.
    #[serde(rename = "rawResponse")]
    pub raw_response: serde_json::Value,
}

/// One buy/sell record produced by structured extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    /// `yyyy-mm-dd` as emitted by the model; not parsed or checked.
    pub date: String,
    /// `Buy` or `Sell`.
    #[serde(rename = "type")]
    pub kind: String,
    pub stock_name: String,
    /// Kept as the model wrote it: `10` stays an integer, large integers
    /// are not rounded through `f64`.
    pub amount: serde_json::Number,
    pub price: serde_json::Number,
    pub currency: String,
}

/// The only accepted shape of a structured-extraction reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionsSchema {
    pub transactions: Vec<Transaction>,
}

/// Wait-for-completion policy shared by every job/run polling backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Overall deadline in seconds; `0` polls until a terminal state.
    pub max_wait_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: poll::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_wait_secs: poll::DEFAULT_MAX_WAIT.as_secs(),
        }
    }
}

impl PollingConfig {
    /// A zero interval would poll the backend in a tight loop.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.interval_ms == 0 {
            return Err(ProviderError::Configuration(
                "polling interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn waiter(&self) -> CompletionWaiter {
        let max_wait = (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs));
        CompletionWaiter::new(Duration::from_millis(self.interval_ms), max_wait)
    }
}

/// Configuration for the extraction core.
///
/// Each provider section is optional; a provider whose section is absent is
/// simply not registered. Secrets are redacted by each section's `Debug`.
#[derive(Debug, Clone)]
pub struct Config {
    pub azure: Option<AzureConfig>,
    pub adobe: Option<AdobeConfig>,
    pub amazon: Option<AmazonConfig>,
    pub google: Option<GoogleConfig>,
    pub anthropic: Option<AnthropicConfig>,
    pub openai: Option<OpenAiConfig>,
    pub polling: PollingConfig,
    pub request_timeout_secs: u64,
    /// Largest accepted document in bytes (0 = unlimited).
    pub max_document_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            azure: None,
            adobe: None,
            amazon: None,
            google: None,
            anthropic: None,
            openai: None,
            polling: PollingConfig::default(),
            request_timeout_secs: http::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            max_document_bytes: document::DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl Config {
    /// Check the settings shared by every backend. Per-provider sections are
    /// validated by their adapter constructors.
    pub fn validate(&self) -> Result<(), ProviderError> {
        self.polling.validate()?;
        if self.request_timeout_secs == 0 {
            return Err(ProviderError::Configuration(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn http_client(&self) -> reqwest::Client {
        http::build_client(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn adapter_settings(&self) -> AdapterSettings {
        AdapterSettings {
            client: self.http_client(),
            waiter: self.polling.waiter(),
            max_document_bytes: self.max_document_bytes,
        }
    }
}
