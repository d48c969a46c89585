use std::fmt;
use std::future::Future;
use std::pin::Pin;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::{AdapterSettings, ProviderAdapter, base_url, require};
use crate::document::validate_document;
use crate::error::ProviderError;
use crate::http::{ensure_success, header_value, read_json};
use crate::poll::{JobHandle, JobStatus};
use crate::provider::Provider;
use crate::ExtractionResult;

pub const DEFAULT_MODEL_ID: &str = "prebuilt-read";
pub const DEFAULT_API_VERSION: &str = "2023-07-31";

#[derive(Clone)]
pub struct AzureConfig {
    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`.
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub api_version: String,
}

impl AzureConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Azure Document Intelligence read model. Analysis is a long-running
/// operation: the submit call returns an `Operation-Location` that is polled
/// until the page/line tree is ready.
pub struct AzureRead {
    endpoint: String,
    api_key: String,
    model_id: String,
    api_version: String,
    settings: AdapterSettings,
}

impl AzureRead {
    pub fn new(config: AzureConfig, settings: AdapterSettings) -> Result<Self, ProviderError> {
        let endpoint = base_url(&config.endpoint, "Azure endpoint")?;
        require(&config.api_key, "Azure API key")?;
        require(&config.model_id, "Azure model id")?;
        require(&config.api_version, "Azure API version")?;
        Ok(Self {
            endpoint,
            api_key: config.api_key,
            model_id: config.model_id,
            api_version: config.api_version,
            settings,
        })
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.endpoint, self.model_id, self.api_version
        )
    }

    /// Start the analysis and return the operation URL to poll.
    async fn submit(&self, document: &[u8]) -> Result<String, ProviderError> {
        let resp = self
            .settings
            .client
            .post(self.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header(CONTENT_TYPE, "application/pdf")
            .body(document.to_vec())
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        header_value(&resp, "operation-location").ok_or_else(|| {
            ProviderError::Upstream("Azure response is missing the Operation-Location header".into())
        })
    }
}

impl ProviderAdapter for AzureRead {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ExtractionResult, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            validate_document(document, self.settings.max_document_bytes)?;

            let operation_url = self.submit(document).await?;
            tracing::debug!(url = %operation_url, "Azure analysis submitted");

            let operation = AnalyzeOperation {
                client: &self.settings.client,
                url: operation_url,
                api_key: &self.api_key,
            };
            let body = self.settings.waiter.await_completion(&operation).await?;

            Ok(ExtractionResult {
                text: text_from_analyze_result(&body),
                raw_response: body,
            })
        })
    }
}

/// Handle for one running analyze operation.
struct AnalyzeOperation<'a> {
    client: &'a reqwest::Client,
    url: String,
    api_key: &'a str,
}

impl JobHandle for AnalyzeOperation<'_> {
    type Output = Value;

    fn poll_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<JobStatus<Value>, ProviderError>> + Send + '_>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(&self.url)
                .header("Ocp-Apim-Subscription-Key", self.api_key)
                .send()
                .await?;
            let body = read_json(ensure_success(resp).await?).await?;
            Ok(operation_status(body))
        })
    }
}

fn operation_status(body: Value) -> JobStatus<Value> {
    match body["status"].as_str().unwrap_or_default() {
        "succeeded" => JobStatus::Succeeded(body),
        "failed" | "canceled" => {
            JobStatus::Failed(body["error"]["message"].as_str().map(String::from))
        }
        "running" => JobStatus::Running,
        _ => JobStatus::Pending,
    }
}

/// Every recognised line, page by page, one per output line.
fn text_from_analyze_result(body: &Value) -> String {
    let lines: Vec<&str> = body["analyzeResult"]["pages"]
        .as_array()
        .map(|pages| {
            pages
                .iter()
                .filter_map(|page| page["lines"].as_array())
                .flatten()
                .filter_map(|line| line["content"].as_str())
                .collect()
        })
        .unwrap_or_default();

    lines.join("\n").trim().to_string()
}
