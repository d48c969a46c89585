//! Provider adapters: one per extraction backend, all behind [`ProviderAdapter`].

pub mod adobe;
pub mod amazon;
pub mod azure;
pub mod google;
pub mod local;
#[cfg(test)]
pub(crate) mod mock;
mod sigv4;

use std::future::Future;
use std::pin::Pin;

use crate::document::DEFAULT_MAX_DOCUMENT_BYTES;
use crate::error::ProviderError;
use crate::http::{DEFAULT_REQUEST_TIMEOUT, build_client};
use crate::poll::CompletionWaiter;
use crate::provider::Provider;
use crate::ExtractionResult;

/// A backend that turns PDF bytes into text.
///
/// Adapters validate their credentials when constructed, so a configured
/// adapter never fails on a missing secret at call time. Any packaged result
/// (archives, block lists, page/line trees) is unwrapped entirely inside
/// [`analyze`](ProviderAdapter::analyze).
pub trait ProviderAdapter: Send + Sync {
    /// The identity this adapter is registered under.
    fn provider(&self) -> Provider;

    /// Extract the text of one document.
    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ExtractionResult, ProviderError>> + Send + 'a>>;
}

/// Transport settings shared by every remote adapter.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub client: reqwest::Client,
    pub waiter: CompletionWaiter,
    /// Largest accepted document in bytes (0 = unlimited).
    pub max_document_bytes: usize,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            client: build_client(DEFAULT_REQUEST_TIMEOUT),
            waiter: CompletionWaiter::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

/// Reject blank configuration values.
pub(crate) fn require(value: &str, what: &str) -> Result<(), ProviderError> {
    if value.trim().is_empty() {
        Err(ProviderError::Configuration(format!("{what} must be set")))
    } else {
        Ok(())
    }
}

/// Normalise a base URL: trim whitespace and trailing slashes, then make
/// sure it parses.
pub(crate) fn base_url(value: &str, what: &str) -> Result<String, ProviderError> {
    require(value, what)?;
    let url = value.trim().trim_end_matches('/').to_string();
    reqwest::Url::parse(&url)
        .map_err(|e| ProviderError::Configuration(format!("invalid {what} {url:?}: {e}")))?;
    Ok(url)
}
