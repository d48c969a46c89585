use std::fmt;
use std::future::Future;
use std::io::{Cursor, Read};
use std::pin::Pin;

use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

use super::{AdapterSettings, ProviderAdapter, base_url, require};
use crate::document::validate_document;
use crate::error::ProviderError;
use crate::http::{ensure_success, header_value, read_json};
use crate::poll::{JobHandle, JobStatus};
use crate::provider::Provider;
use crate::ExtractionResult;

pub const DEFAULT_BASE_URL: &str = "https://pdf-services.adobe.io";

/// Name of the JSON document inside the Extract API result archive.
const STRUCTURED_DATA_ENTRY: &str = "structuredData.json";

#[derive(Clone)]
pub struct AdobeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl AdobeConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for AdobeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdobeConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Adobe PDF Services Extract API.
///
/// One call runs the whole job lifecycle: token, asset upload, extract job,
/// status polling, archive download, then `structuredData.json` is read out
/// of the ZIP in memory.
pub struct AdobeExtract {
    client_id: String,
    client_secret: String,
    base_url: String,
    settings: AdapterSettings,
}

impl AdobeExtract {
    pub fn new(config: AdobeConfig, settings: AdapterSettings) -> Result<Self, ProviderError> {
        require(&config.client_id, "Adobe PDF Services client id")?;
        require(&config.client_secret, "Adobe PDF Services client secret")?;
        let base_url = base_url(&config.base_url, "Adobe PDF Services URL")?;
        Ok(Self {
            client_id: config.client_id,
            client_secret: config.client_secret,
            base_url,
            settings,
        })
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let resp = self
            .settings
            .client
            .post(format!("{}/token", self.base_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;
        let body = read_json(ensure_success(resp).await?).await?;
        body["access_token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ProviderError::Upstream("Adobe token response has no access_token".into()))
    }

    /// Register an asset and upload the document into it. Returns the asset id.
    async fn upload(&self, token: &str, document: &[u8]) -> Result<String, ProviderError> {
        let resp = self
            .settings
            .client
            .post(format!("{}/assets", self.base_url))
            .header("X-API-Key", &self.client_id)
            .bearer_auth(token)
            .json(&json!({ "mediaType": "application/pdf" }))
            .send()
            .await?;
        let asset = read_json(ensure_success(resp).await?).await?;
        let upload_uri = asset["uploadUri"]
            .as_str()
            .ok_or_else(|| ProviderError::Upstream("Adobe asset response has no uploadUri".into()))?;
        let asset_id = asset["assetID"]
            .as_str()
            .ok_or_else(|| ProviderError::Upstream("Adobe asset response has no assetID".into()))?
            .to_string();

        let resp = self
            .settings
            .client
            .put(upload_uri)
            .header(CONTENT_TYPE, "application/pdf")
            .body(document.to_vec())
            .send()
            .await?;
        ensure_success(resp).await?;

        Ok(asset_id)
    }

    /// Submit the text extraction job. Returns the polling URL.
    async fn submit(&self, token: &str, asset_id: &str) -> Result<String, ProviderError> {
        let resp = self
            .settings
            .client
            .post(format!("{}/operation/extractpdf", self.base_url))
            .header("X-API-Key", &self.client_id)
            .bearer_auth(token)
            .json(&json!({
                "assetID": asset_id,
                "elementsToExtract": ["text"],
            }))
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        header_value(&resp, "location").ok_or_else(|| {
            ProviderError::Upstream("Adobe job response is missing the location header".into())
        })
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, ProviderError> {
        let resp = self.settings.client.get(uri).send().await?;
        let bytes = ensure_success(resp).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

impl ProviderAdapter for AdobeExtract {
    fn provider(&self) -> Provider {
        Provider::Adobe
    }

    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ExtractionResult, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            validate_document(document, self.settings.max_document_bytes)?;

            let token = self.access_token().await?;
            let asset_id = self.upload(&token, document).await?;
            let polling_url = self.submit(&token, &asset_id).await?;
            tracing::debug!(asset_id = %asset_id, "Adobe extract job submitted");

            let job = ExtractJob {
                client: &self.settings.client,
                url: polling_url,
                client_id: &self.client_id,
                token: &token,
            };
            let finished = self.settings.waiter.await_completion(&job).await?;

            let download_uri = finished["resource"]["downloadUri"]
                .as_str()
                .ok_or_else(|| {
                    ProviderError::Upstream("Adobe job result has no resource downloadUri".into())
                })?;
            let archive = self.download(download_uri).await?;
            let structured = read_structured_data(&archive)?;

            Ok(ExtractionResult {
                text: text_from_elements(&structured),
                raw_response: structured,
            })
        })
    }
}

struct ExtractJob<'a> {
    client: &'a reqwest::Client,
    url: String,
    client_id: &'a str,
    token: &'a str,
}

impl JobHandle for ExtractJob<'_> {
    type Output = Value;

    fn poll_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<JobStatus<Value>, ProviderError>> + Send + '_>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(&self.url)
                .header("X-API-Key", self.client_id)
                .bearer_auth(self.token)
                .send()
                .await?;
            let body = read_json(ensure_success(resp).await?).await?;
            Ok(job_status(body))
        })
    }
}

fn job_status(body: Value) -> JobStatus<Value> {
    match body["status"].as_str().unwrap_or_default() {
        "done" => JobStatus::Succeeded(body),
        "failed" => JobStatus::Failed(body["error"]["message"].as_str().map(String::from)),
        "in progress" => JobStatus::Running,
        _ => JobStatus::Pending,
    }
}

/// Unpack `structuredData.json` from the result archive.
fn read_structured_data(archive: &[u8]) -> Result<Value, ProviderError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| ProviderError::Upstream(format!("failed to open Adobe result archive: {e}")))?;
    let mut entry = zip.by_name(STRUCTURED_DATA_ENTRY).map_err(|e| {
        ProviderError::Upstream(format!(
            "Adobe result archive has no {STRUCTURED_DATA_ENTRY}: {e}"
        ))
    })?;

    let mut json = String::new();
    entry
        .read_to_string(&mut json)
        .map_err(|e| ProviderError::Upstream(format!("failed to read {STRUCTURED_DATA_ENTRY}: {e}")))?;

    serde_json::from_str(&json)
        .map_err(|e| ProviderError::Upstream(format!("invalid {STRUCTURED_DATA_ENTRY}: {e}")))
}

/// The `Text` of every element that carries one, in document order.
fn text_from_elements(structured: &Value) -> String {
    let lines: Vec<&str> = structured["elements"]
        .as_array()
        .map(|elements| {
            elements
                .iter()
                .filter_map(|el| el["Text"].as_str())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    lines.join("\n").trim().to_string()
}
