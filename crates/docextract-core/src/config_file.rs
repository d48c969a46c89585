use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub azure: Option<AzureSection>,
    pub adobe: Option<AdobeSection>,
    pub amazon: Option<AmazonSection>,
    pub google: Option<GoogleSection>,
    pub anthropic: Option<AnthropicSection>,
    pub openai: Option<OpenAiSection>,
    pub polling: Option<PollingSection>,
    pub limits: Option<LimitsSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model_id: Option<String>,
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdobeSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmazonSection {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleSection {
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub processor_id: Option<String>,
    pub statement_processor_id: Option<String>,
    pub key_file: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnthropicSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollingSection {
    pub interval_ms: Option<u64>,
    /// 0 disables the overall deadline.
    pub max_wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitsSection {
    pub request_timeout_secs: Option<u64>,
    pub max_document_bytes: Option<usize>,
}

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".docextract.toml";

/// Platform config directory path: `<config_dir>/docextract/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docextract").join("config.toml"))
}

/// Load config by cascading CWD `.docextract.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(LOCAL_CONFIG_FILE));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    match try_load_from_path(path) {
        Ok(config) => Some(config),
        Err(ConfigError::Read { .. }) => None,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring config file");
            None
        }
    }
}

/// Load a config the caller asked for explicitly; every failure is reported.
pub fn try_load_from_path(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Field-level merge of one optional section: `overlay` wins.
fn pick<S, T>(base: &Option<S>, overlay: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
/// A section absent from both stays absent.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let b = &base;
    let o = &overlay;

    let azure = (b.azure.is_some() || o.azure.is_some()).then(|| AzureSection {
        endpoint: pick(&b.azure, &o.azure, |s| s.endpoint.clone()),
        api_key: pick(&b.azure, &o.azure, |s| s.api_key.clone()),
        model_id: pick(&b.azure, &o.azure, |s| s.model_id.clone()),
        api_version: pick(&b.azure, &o.azure, |s| s.api_version.clone()),
    });
    let adobe = (b.adobe.is_some() || o.adobe.is_some()).then(|| AdobeSection {
        client_id: pick(&b.adobe, &o.adobe, |s| s.client_id.clone()),
        client_secret: pick(&b.adobe, &o.adobe, |s| s.client_secret.clone()),
        base_url: pick(&b.adobe, &o.adobe, |s| s.base_url.clone()),
    });
    let amazon = (b.amazon.is_some() || o.amazon.is_some()).then(|| AmazonSection {
        region: pick(&b.amazon, &o.amazon, |s| s.region.clone()),
        access_key_id: pick(&b.amazon, &o.amazon, |s| s.access_key_id.clone()),
        secret_access_key: pick(&b.amazon, &o.amazon, |s| s.secret_access_key.clone()),
        session_token: pick(&b.amazon, &o.amazon, |s| s.session_token.clone()),
        endpoint: pick(&b.amazon, &o.amazon, |s| s.endpoint.clone()),
    });
    let google = (b.google.is_some() || o.google.is_some()).then(|| GoogleSection {
        project_id: pick(&b.google, &o.google, |s| s.project_id.clone()),
        location: pick(&b.google, &o.google, |s| s.location.clone()),
        processor_id: pick(&b.google, &o.google, |s| s.processor_id.clone()),
        statement_processor_id: pick(&b.google, &o.google, |s| s.statement_processor_id.clone()),
        key_file: pick(&b.google, &o.google, |s| s.key_file.clone()),
        endpoint: pick(&b.google, &o.google, |s| s.endpoint.clone()),
    });
    let anthropic = (b.anthropic.is_some() || o.anthropic.is_some()).then(|| AnthropicSection {
        api_key: pick(&b.anthropic, &o.anthropic, |s| s.api_key.clone()),
        model: pick(&b.anthropic, &o.anthropic, |s| s.model.clone()),
        max_tokens: pick(&b.anthropic, &o.anthropic, |s| s.max_tokens),
        base_url: pick(&b.anthropic, &o.anthropic, |s| s.base_url.clone()),
    });
    let openai = (b.openai.is_some() || o.openai.is_some()).then(|| OpenAiSection {
        api_key: pick(&b.openai, &o.openai, |s| s.api_key.clone()),
        assistant_id: pick(&b.openai, &o.openai, |s| s.assistant_id.clone()),
        base_url: pick(&b.openai, &o.openai, |s| s.base_url.clone()),
    });
    let polling = (b.polling.is_some() || o.polling.is_some()).then(|| PollingSection {
        interval_ms: pick(&b.polling, &o.polling, |s| s.interval_ms),
        max_wait_secs: pick(&b.polling, &o.polling, |s| s.max_wait_secs),
    });
    let limits = (b.limits.is_some() || o.limits.is_some()).then(|| LimitsSection {
        request_timeout_secs: pick(&b.limits, &o.limits, |s| s.request_timeout_secs),
        max_document_bytes: pick(&b.limits, &o.limits, |s| s.max_document_bytes),
    });

    ConfigFile {
        azure,
        adobe,
        amazon,
        google,
        anthropic,
        openai,
        polling,
        limits,
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to_path(config, &path)?;
    Ok(path)
}

pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
