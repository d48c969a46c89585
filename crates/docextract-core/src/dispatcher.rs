use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::adapters::ProviderAdapter;
use crate::adapters::adobe::AdobeExtract;
use crate::adapters::amazon::AmazonTextract;
use crate::adapters::azure::AzureRead;
use crate::adapters::google::GoogleDocumentAi;
use crate::adapters::local::LocalParse;
use crate::backend::PdfBackend;
use crate::error::{ExtractError, ProviderError};
use crate::provider::Provider;
use crate::{Config, ExtractionResult};

/// Routes a document to the adapter registered for a provider and
/// attaches the provider identity to any failure.
#[derive(Clone, Default)]
pub struct ExtractionDispatcher {
    adapters: BTreeMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl ExtractionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dispatcher with every adapter whose config section is present.
    ///
    /// Fails on the first section that does not validate, before any
    /// network call is made. `local_backend` enables the local provider.
    pub fn from_config(
        config: &Config,
        local_backend: Option<Arc<dyn PdfBackend>>,
    ) -> Result<Self, ExtractError> {
        config.validate().map_err(ExtractError::InvalidConfig)?;
        let settings = config.adapter_settings();
        let mut dispatcher = Self::new();
        let wrap = |provider: Provider| {
            move |source: ProviderError| ExtractError::Provider { provider, source }
        };

        if let Some(backend) = local_backend {
            dispatcher.register(
                LocalParse::new(backend).with_max_document_bytes(config.max_document_bytes),
            );
        }
        if let Some(ref azure) = config.azure {
            dispatcher.register(
                AzureRead::new(azure.clone(), settings.clone()).map_err(wrap(Provider::Azure))?,
            );
        }
        if let Some(ref adobe) = config.adobe {
            dispatcher.register(
                AdobeExtract::new(adobe.clone(), settings.clone()).map_err(wrap(Provider::Adobe))?,
            );
        }
        if let Some(ref amazon) = config.amazon {
            dispatcher.register(
                AmazonTextract::new(amazon.clone(), settings.clone())
                    .map_err(wrap(Provider::Amazon))?,
            );
        }
        if let Some(ref google) = config.google {
            let (general, statement) = GoogleDocumentAi::from_config(google, settings.clone())
                .map_err(wrap(Provider::Google))?;
            dispatcher.register(general);
            dispatcher.register(statement);
        }

        tracing::debug!(providers = ?dispatcher.providers(), "extraction dispatcher ready");
        Ok(dispatcher)
    }

    /// Register `adapter` under its own provider identity, replacing any
    /// adapter registered for the same provider.
    pub fn register<A: ProviderAdapter + 'static>(&mut self, adapter: A) -> &mut Self {
        self.register_arc(Arc::new(adapter))
    }

    pub fn register_arc(&mut self, adapter: Arc<dyn ProviderAdapter>) -> &mut Self {
        self.adapters.insert(adapter.provider(), adapter);
        self
    }

    /// Registered providers, in [`Provider::ALL`] order.
    pub fn providers(&self) -> Vec<Provider> {
        self.adapters.keys().copied().collect()
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }

    /// Extract text using the provider named `provider`.
    ///
    /// The name is resolved before the document is looked at, so an unknown
    /// name fails with [`ExtractError::InvalidProvider`] and no adapter runs.
    pub async fn extract(
        &self,
        document: &[u8],
        provider: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        let provider: Provider = provider.parse()?;
        self.extract_with(document, provider).await
    }

    pub async fn extract_with(
        &self,
        document: &[u8],
        provider: Provider,
    ) -> Result<ExtractionResult, ExtractError> {
        if document.is_empty() {
            return Err(ExtractError::Provider {
                provider,
                source: ProviderError::Input("empty document".into()),
            });
        }
        let adapter = self
            .adapters
            .get(&provider)
            .ok_or(ExtractError::NotConfigured(provider))?;

        let start = Instant::now();
        let result = adapter
            .analyze(document)
            .await
            .map_err(|source| ExtractError::Provider { provider, source })?;

        tracing::info!(
            provider = %provider,
            bytes = document.len(),
            chars = result.text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "extraction complete"
        );
        Ok(result)
    }
}
