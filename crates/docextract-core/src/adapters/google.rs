use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{Value, json};

use super::{AdapterSettings, ProviderAdapter, base_url, require};
use crate::document::validate_document;
use crate::error::ProviderError;
use crate::http::{ensure_success, read_json};
use crate::provider::Provider;
use crate::ExtractionResult;

pub const DEFAULT_LOCATION: &str = "us";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Fields a service-account key file must carry.
const REQUIRED_KEY_FIELDS: [&str; 4] = ["type", "project_id", "private_key", "client_email"];

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub project_id: String,
    pub location: String,
    /// General document OCR processor.
    pub processor_id: String,
    /// Bank/brokerage statement processor.
    pub statement_processor_id: String,
    /// Path to the service-account JSON key.
    pub key_file: PathBuf,
    /// Override for `https://<location>-documentai.googleapis.com`.
    pub endpoint: Option<String>,
}

impl GoogleConfig {
    pub fn new(
        project_id: impl Into<String>,
        processor_id: impl Into<String>,
        statement_processor_id: impl Into<String>,
        key_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: DEFAULT_LOCATION.to_string(),
            processor_id: processor_id.into(),
            statement_processor_id: statement_processor_id.into(),
            key_file: key_file.into(),
            endpoint: None,
        }
    }
}

/// A validated service-account key, loaded once and shared by both
/// Document AI identities.
pub struct ServiceAccount {
    client_email: String,
    token_uri: String,
    key: EncodingKey,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("key", &"***")
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccount {
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        if !path.is_file() {
            return Err(ProviderError::Configuration(format!(
                "service account key file not found at: {}",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Configuration(format!(
                "failed to read service account key file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ProviderError> {
        let invalid =
            |msg: String| ProviderError::Configuration(format!("invalid service account key file: {msg}"));

        let value: Value = serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        for field in REQUIRED_KEY_FIELDS {
            if value[field].as_str().is_none_or(|s| s.trim().is_empty()) {
                return Err(invalid(format!("missing required field: {field}")));
            }
        }

        let private_key = value["private_key"].as_str().unwrap_or_default();
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| invalid(format!("private_key is not a valid RSA key: {e}")))?;

        Ok(Self {
            client_email: value["client_email"].as_str().unwrap_or_default().to_string(),
            token_uri: value["token_uri"]
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_TOKEN_URI)
                .to_string(),
            key,
        })
    }

    /// Self-signed JWT for the OAuth2 JWT-bearer grant.
    fn assertion(&self) -> Result<String, ProviderError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| ProviderError::Configuration(format!("failed to sign token assertion: {e}")))
    }

    async fn access_token(&self, client: &reqwest::Client) -> Result<String, ProviderError> {
        let assertion = self.assertion()?;
        let resp = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let body = read_json(ensure_success(resp).await?).await?;
        body["access_token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ProviderError::Upstream("Google token response has no access_token".into()))
    }
}

/// Google Document AI `:process`. The general and statement identities
/// share this type and differ only in the processor they address.
pub struct GoogleDocumentAi {
    provider: Provider,
    process_url: String,
    account: Arc<ServiceAccount>,
    settings: AdapterSettings,
}

impl GoogleDocumentAi {
    /// Build both identities from one config, reading the key file once.
    pub fn from_config(
        config: &GoogleConfig,
        settings: AdapterSettings,
    ) -> Result<(Self, Self), ProviderError> {
        require(&config.processor_id, "Google processor id")?;
        require(&config.statement_processor_id, "Google statement processor id")?;
        let account = Arc::new(ServiceAccount::load(&config.key_file)?);
        let general = Self::new(config, Provider::Google, account.clone(), settings.clone())?;
        let statement = Self::new(config, Provider::GoogleStatement, account, settings)?;
        Ok((general, statement))
    }

    pub fn new(
        config: &GoogleConfig,
        provider: Provider,
        account: Arc<ServiceAccount>,
        settings: AdapterSettings,
    ) -> Result<Self, ProviderError> {
        require(&config.project_id, "Google project id")?;
        require(&config.location, "Google location")?;
        let processor_id = match provider {
            Provider::Google => &config.processor_id,
            Provider::GoogleStatement => &config.statement_processor_id,
            other => {
                return Err(ProviderError::Configuration(format!(
                    "{other} is not a Document AI provider"
                )));
            }
        };
        require(processor_id, "Google processor id")?;

        let location = config.location.trim();
        let endpoint = match config.endpoint.as_deref() {
            Some(e) => base_url(e, "Document AI endpoint")?,
            None => format!("https://{location}-documentai.googleapis.com"),
        };
        let process_url = format!(
            "{endpoint}/v1/projects/{}/locations/{location}/processors/{}:process",
            config.project_id.trim(),
            processor_id.trim()
        );

        Ok(Self {
            provider,
            process_url,
            account,
            settings,
        })
    }
}

impl ProviderAdapter for GoogleDocumentAi {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ExtractionResult, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            validate_document(document, self.settings.max_document_bytes)?;

            let token = self.account.access_token(&self.settings.client).await?;
            tracing::debug!(provider = %self.provider, url = %self.process_url, "sending Document AI request");

            let resp = self
                .settings
                .client
                .post(&self.process_url)
                .bearer_auth(token)
                .json(&json!({
                    "rawDocument": {
                        "content": BASE64.encode(document),
                        "mimeType": "application/pdf",
                    }
                }))
                .send()
                .await?;
            let body = read_json(ensure_success(resp).await?).await?;

            Ok(ExtractionResult {
                text: body["document"]["text"].as_str().unwrap_or_default().to_string(),
                raw_response: body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");

    fn key_json(overrides: Value) -> String {
        let mut key = json!({
            "type": "service_account",
            "project_id": "demo-project",
            "private_key": TEST_KEY,
            "client_email": "extractor@demo-project.iam.gserviceaccount.com",
        });
        if let (Some(base), Some(extra)) = (key.as_object_mut(), overrides.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        key.to_string()
    }

    #[test]
    fn loads_valid_key() {
        let account = ServiceAccount::from_json(&key_json(json!({}))).unwrap();
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
        assert!(!format!("{account:?}").contains("PRIVATE KEY"));
    }

    #[test]
    fn assertion_is_a_signed_jwt() {
        let account = ServiceAccount::from_json(&key_json(json!({}))).unwrap();
        let jwt = account.assertion().unwrap();
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[test]
    fn missing_field_is_named() {
        let err = ServiceAccount::from_json(&key_json(json!({"client_email": ""}))).unwrap_err();
        assert!(err.message().contains("client_email"));
    }

    #[test]
    fn bad_private_key_is_rejected() {
        let err =
            ServiceAccount::from_json(&key_json(json!({"private_key": "not a pem"}))).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains("private_key"));
    }

    #[test]
    fn missing_key_file_fails_fast() {
        let config = GoogleConfig::new("p", "g", "s", "/nonexistent/key.json");
        let err = GoogleDocumentAi::from_config(&config, AdapterSettings::default())
            .err()
            .unwrap();
        assert!(err.message().contains("not found"));
    }

    #[test]
    fn both_identities_share_one_account() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(key_json(json!({})).as_bytes()).unwrap();

        let mut config = GoogleConfig::new("demo-project", "gen123", "stmt456", file.path());
        config.location = "eu".into();
        let (general, statement) =
            GoogleDocumentAi::from_config(&config, AdapterSettings::default()).unwrap();

        assert_eq!(general.provider(), Provider::Google);
        assert_eq!(statement.provider(), Provider::GoogleStatement);
        assert_eq!(
            general.process_url,
            "https://eu-documentai.googleapis.com/v1/projects/demo-project/locations/eu/processors/gen123:process"
        );
        assert!(statement.process_url.ends_with("/processors/stmt456:process"));
        assert!(Arc::ptr_eq(&general.account, &statement.account));
    }

    #[test]
    fn statement_processor_is_required() {
        let config = GoogleConfig::new("p", "g", " ", "/tmp/unused.json");
        let err = GoogleDocumentAi::from_config(&config, AdapterSettings::default())
            .err()
            .unwrap();
        assert!(err.message().contains("statement processor"));
    }
}
