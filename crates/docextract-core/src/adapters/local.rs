use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::json;

use super::ProviderAdapter;
use crate::backend::PdfBackend;
use crate::document::{DEFAULT_MAX_DOCUMENT_BYTES, validate_document};
use crate::error::ProviderError;
use crate::provider::Provider;
use crate::ExtractionResult;

/// In-process text-layer extraction through a [`PdfBackend`].
///
/// Needs no credentials. Parsing is CPU-bound, so it runs on the blocking
/// thread pool.
pub struct LocalParse {
    backend: Arc<dyn PdfBackend>,
    max_document_bytes: usize,
}

impl LocalParse {
    pub fn new(backend: Arc<dyn PdfBackend>) -> Self {
        Self {
            backend,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    pub fn with_max_document_bytes(mut self, max: usize) -> Self {
        self.max_document_bytes = max;
        self
    }
}

impl ProviderAdapter for LocalParse {
    fn provider(&self) -> Provider {
        Provider::Local
    }

    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ExtractionResult, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            validate_document(document, self.max_document_bytes)?;

            let backend = Arc::clone(&self.backend);
            let bytes = document.to_vec();
            let parsed = tokio::task::spawn_blocking(move || backend.extract_text(&bytes))
                .await
                .map_err(|e| ProviderError::Upstream(format!("PDF parser task failed: {e}")))?
                .map_err(|e| ProviderError::Upstream(e.to_string()))?;

            tracing::debug!(pages = parsed.num_pages, chars = parsed.text.len(), "parsed PDF locally");
            Ok(ExtractionResult {
                raw_response: json!({ "numPages": parsed.num_pages }),
                text: parsed.text,
            })
        })
    }
}
