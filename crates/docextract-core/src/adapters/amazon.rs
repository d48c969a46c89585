use std::fmt;
use std::future::Future;
use std::pin::Pin;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};

use super::sigv4::{self, Credentials, Request};
use super::{AdapterSettings, ProviderAdapter, base_url, require};
use crate::document::validate_document;
use crate::error::ProviderError;
use crate::http::{ensure_success, read_json};
use crate::provider::Provider;
use crate::ExtractionResult;

const SERVICE: &str = "textract";
const TARGET: &str = "Textract.DetectDocumentText";
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Clone)]
pub struct AmazonConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    /// Override for the regional endpoint (`https://textract.<region>.amazonaws.com`).
    pub endpoint: Option<String>,
}

impl AmazonConfig {
    pub fn new(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            endpoint: None,
        }
    }
}

impl fmt::Debug for AmazonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmazonConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Amazon Textract `DetectDocumentText`: synchronous, returns a flat list of
/// blocks of which only `LINE` blocks are kept.
pub struct AmazonTextract {
    region: String,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    endpoint: String,
    host: String,
    settings: AdapterSettings,
}

impl AmazonTextract {
    pub fn new(config: AmazonConfig, settings: AdapterSettings) -> Result<Self, ProviderError> {
        require(&config.region, "AWS region")?;
        require(&config.access_key_id, "AWS access key id")?;
        require(&config.secret_access_key, "AWS secret access key")?;

        let region = config.region.trim().to_string();
        let endpoint = match config.endpoint.as_deref() {
            Some(e) => base_url(e, "Textract endpoint")?,
            None => format!("https://{SERVICE}.{region}.amazonaws.com"),
        };
        let host = host_of(&endpoint)?;

        Ok(Self {
            region,
            access_key_id: config.access_key_id,
            secret_access_key: config.secret_access_key,
            session_token: config.session_token.filter(|t| !t.trim().is_empty()),
            endpoint,
            host,
            settings,
        })
    }
}

/// Host header value as reqwest will send it (port included when non-default).
fn host_of(endpoint: &str) -> Result<String, ProviderError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| ProviderError::Configuration(format!("invalid Textract endpoint: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| ProviderError::Configuration("Textract endpoint has no host".into()))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

impl ProviderAdapter for AmazonTextract {
    fn provider(&self) -> Provider {
        Provider::Amazon
    }

    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ExtractionResult, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            validate_document(document, self.settings.max_document_bytes)?;

            let payload = json!({ "Document": { "Bytes": BASE64.encode(document) } }).to_string();
            let signature = sigv4::sign(
                &Request {
                    method: "POST",
                    host: &self.host,
                    path: "/",
                    headers: &[("content-type", JSON_CONTENT_TYPE), ("x-amz-target", TARGET)],
                    payload: payload.as_bytes(),
                },
                &Credentials {
                    access_key_id: &self.access_key_id,
                    secret_access_key: &self.secret_access_key,
                    session_token: self.session_token.as_deref(),
                },
                &self.region,
                SERVICE,
                chrono::Utc::now(),
            )?;

            tracing::debug!(region = %self.region, bytes = document.len(), "sending Textract request");
            let mut req = self
                .settings
                .client
                .post(format!("{}/", self.endpoint))
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .header("X-Amz-Target", TARGET)
                .header("X-Amz-Date", &signature.amz_date)
                .header(AUTHORIZATION, &signature.authorization)
                .body(payload);
            if let Some(ref token) = self.session_token {
                req = req.header("X-Amz-Security-Token", token);
            }

            let body = read_json(ensure_success(req.send().await?).await?).await?;
            Ok(ExtractionResult {
                text: text_from_blocks(&body),
                raw_response: body,
            })
        })
    }
}

fn text_from_blocks(body: &Value) -> String {
    body["Blocks"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["BlockType"] == "LINE")
                .filter_map(|b| b["Text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}
