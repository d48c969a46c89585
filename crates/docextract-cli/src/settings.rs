//! Configuration resolution: CLI flags > environment > config file > defaults.

use std::path::PathBuf;

use docextract_core::adapters::{adobe, azure, google};
use docextract_core::config_file::ConfigFile;
use docextract_core::generative::anthropic;
use docextract_core::generative::openai;
use docextract_core::{
    AdobeConfig, AmazonConfig, AnthropicConfig, AzureConfig, Config, GoogleConfig, OpenAiConfig,
    PollingConfig, Provider,
};

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_wait_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// First non-blank value among env and file.
fn first(env_value: Option<String>, file_value: Option<&String>) -> Option<String> {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| file_value.filter(|v| !v.trim().is_empty()).cloned())
}

/// Build the core [`Config`].
///
/// A provider section is created as soon as any of its values is set;
/// values still missing are left blank so the adapter constructor reports
/// exactly which one is absent.
pub fn resolve(
    file: &ConfigFile,
    overrides: &Overrides,
    env: impl Fn(&str) -> Option<String>,
) -> Config {
    let defaults = Config::default();

    let azure = {
        let s = file.azure.clone().unwrap_or_default();
        let endpoint = first(env("AZURE_READ_ENDPOINT"), s.endpoint.as_ref());
        let api_key = first(env("AZURE_READ_KEY"), s.api_key.as_ref());
        (endpoint.is_some() || api_key.is_some()).then(|| AzureConfig {
            endpoint: endpoint.unwrap_or_default(),
            api_key: api_key.unwrap_or_default(),
            model_id: s.model_id.unwrap_or_else(|| azure::DEFAULT_MODEL_ID.to_string()),
            api_version: s
                .api_version
                .unwrap_or_else(|| azure::DEFAULT_API_VERSION.to_string()),
        })
    };

    let adobe = {
        let s = file.adobe.clone().unwrap_or_default();
        let client_id = first(env("PDF_SERVICES_CLIENT_ID"), s.client_id.as_ref());
        let client_secret = first(env("PDF_SERVICES_CLIENT_SECRET"), s.client_secret.as_ref());
        (client_id.is_some() || client_secret.is_some()).then(|| AdobeConfig {
            client_id: client_id.unwrap_or_default(),
            client_secret: client_secret.unwrap_or_default(),
            base_url: s
                .base_url
                .unwrap_or_else(|| adobe::DEFAULT_BASE_URL.to_string()),
        })
    };

    let amazon = {
        let s = file.amazon.clone().unwrap_or_default();
        let access_key_id = first(env("AWS_ACCESS_KEY_ID"), s.access_key_id.as_ref());
        let secret_access_key = first(env("AWS_SECRET_ACCESS_KEY"), s.secret_access_key.as_ref());
        (access_key_id.is_some() || secret_access_key.is_some()).then(|| AmazonConfig {
            region: first(env("AWS_REGION"), s.region.as_ref()).unwrap_or_default(),
            access_key_id: access_key_id.unwrap_or_default(),
            secret_access_key: secret_access_key.unwrap_or_default(),
            session_token: first(env("AWS_SESSION_TOKEN"), s.session_token.as_ref()),
            endpoint: s.endpoint,
        })
    };

    let google = {
        let s = file.google.clone().unwrap_or_default();
        let project_id = first(env("GOOGLE_PROJECT_ID"), s.project_id.as_ref());
        let processor_id = first(env("GOOGLE_PROCESSOR_ID"), s.processor_id.as_ref());
        let statement_processor_id = first(
            env("GOOGLE_STATEMENT_PROCESSOR_ID"),
            s.statement_processor_id.as_ref(),
        );
        let key_file = first(env("GOOGLE_KEY_FILE_PATH"), s.key_file.as_ref());
        let any_set = project_id.is_some()
            || processor_id.is_some()
            || statement_processor_id.is_some()
            || key_file.is_some();
        any_set.then(|| GoogleConfig {
            project_id: project_id.unwrap_or_default(),
            location: first(env("GOOGLE_LOCATION"), s.location.as_ref())
                .unwrap_or_else(|| google::DEFAULT_LOCATION.to_string()),
            processor_id: processor_id.unwrap_or_default(),
            statement_processor_id: statement_processor_id.unwrap_or_default(),
            key_file: PathBuf::from(key_file.unwrap_or_default()),
            endpoint: s.endpoint,
        })
    };

    let anthropic = {
        let s = file.anthropic.clone().unwrap_or_default();
        first(env("ANTHROPIC_API_KEY"), s.api_key.as_ref()).map(|api_key| AnthropicConfig {
            api_key,
            model: s.model.unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string()),
            max_tokens: s.max_tokens.unwrap_or(anthropic::DEFAULT_MAX_TOKENS),
            base_url: s
                .base_url
                .unwrap_or_else(|| anthropic::DEFAULT_BASE_URL.to_string()),
        })
    };

    let openai = {
        let s = file.openai.clone().unwrap_or_default();
        let api_key = first(env("OPENAI_API_KEY"), s.api_key.as_ref());
        let assistant_id = first(env("OPENAI_ASSISTANT_ID"), s.assistant_id.as_ref());
        (api_key.is_some() || assistant_id.is_some()).then(|| OpenAiConfig {
            api_key: api_key.unwrap_or_default(),
            assistant_id: assistant_id.unwrap_or_default(),
            base_url: s
                .base_url
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
        })
    };

    let polling_file = file.polling.clone().unwrap_or_default();
    let limits_file = file.limits.clone().unwrap_or_default();
    let polling = PollingConfig {
        interval_ms: polling_file
            .interval_ms
            .unwrap_or(defaults.polling.interval_ms),
        max_wait_secs: overrides
            .max_wait_secs
            .or(polling_file.max_wait_secs)
            .unwrap_or(defaults.polling.max_wait_secs),
    };

    Config {
        azure,
        adobe,
        amazon,
        google,
        anthropic,
        openai,
        polling,
        request_timeout_secs: overrides
            .request_timeout_secs
            .or(limits_file.request_timeout_secs)
            .unwrap_or(defaults.request_timeout_secs),
        max_document_bytes: limits_file
            .max_document_bytes
            .unwrap_or(defaults.max_document_bytes),
    }
}

/// Keep only the provider section `provider` needs, so an unrelated broken
/// section does not stop this extraction.
pub fn restrict(config: &Config, provider: Provider) -> Config {
    Config {
        azure: config.azure.clone().filter(|_| provider == Provider::Azure),
        adobe: config.adobe.clone().filter(|_| provider == Provider::Adobe),
        amazon: config.amazon.clone().filter(|_| provider == Provider::Amazon),
        google: config
            .google
            .clone()
            .filter(|_| matches!(provider, Provider::Google | Provider::GoogleStatement)),
        ..config.clone()
    }
}

/// Whether `config` has a section for `provider`. The local parser needs none.
pub fn has_section(config: &Config, provider: Provider) -> bool {
    match provider {
        Provider::Local => true,
        Provider::Azure => config.azure.is_some(),
        Provider::Adobe => config.adobe.is_some(),
        Provider::Amazon => config.amazon.is_some(),
        Provider::Google | Provider::GoogleStatement => config.google.is_some(),
    }
}
