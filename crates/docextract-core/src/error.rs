use std::fmt;

use thiserror::Error;

use crate::provider::Provider;

/// Coarse classification shared by every error the core returns, so callers
/// can report failures uniformly without matching on backend-specific shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required credential or endpoint is missing or malformed.
    Configuration,
    /// Caller-supplied bytes or provider name failed basic checks.
    Input,
    /// The external service rejected the request or reported a failure.
    Upstream,
    /// A generative reply could not be located or parsed as JSON.
    Parse,
    /// Parsed JSON does not conform to the transactions schema.
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Input => "input",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// Failure raised by a single adapter or generative backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Configuration(_) => ErrorKind::Configuration,
            ProviderError::Input(_) => ErrorKind::Input,
            ProviderError::Upstream(_) => ErrorKind::Upstream,
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            ProviderError::Configuration(m)
            | ProviderError::Input(m)
            | ProviderError::Upstream(m) => m,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Upstream(format!("request timed out: {e}"))
        } else {
            ProviderError::Upstream(e.to_string())
        }
    }
}

/// Error surface of [`ExtractionDispatcher`](crate::dispatcher::ExtractionDispatcher).
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid provider: {0:?}")]
    InvalidProvider(String),
    #[error("provider {0} is not configured")]
    NotConfigured(Provider),
    /// A setting shared by every provider is invalid.
    #[error("{0}")]
    InvalidConfig(#[source] ProviderError),
    #[error("{provider}: {source}")]
    Provider {
        provider: Provider,
        #[source]
        source: ProviderError,
    },
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidProvider(_) => ErrorKind::Input,
            ExtractError::NotConfigured(_) => ErrorKind::Configuration,
            ExtractError::InvalidConfig(source) => source.kind(),
            ExtractError::Provider { source, .. } => source.kind(),
        }
    }

    /// The provider the failure is attributed to, if one was resolved.
    pub fn provider(&self) -> Option<Provider> {
        match self {
            ExtractError::InvalidProvider(_) | ExtractError::InvalidConfig(_) => None,
            ExtractError::NotConfigured(p) => Some(*p),
            ExtractError::Provider { provider, .. } => Some(*provider),
        }
    }
}

/// Error surface of [`StructuredExtractor`](crate::structured::StructuredExtractor).
#[derive(Error, Debug)]
pub enum StructuredError {
    #[error("{backend}: {source}")]
    Backend {
        backend: String,
        #[source]
        source: ProviderError,
    },
    #[error("{backend}: parse error: {message}")]
    Parse { backend: String, message: String },
    #[error("{backend}: schema validation failed: {}", .violations.join("; "))]
    Validation {
        backend: String,
        violations: Vec<String>,
    },
}

impl StructuredError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StructuredError::Backend { source, .. } => source.kind(),
            StructuredError::Parse { .. } => ErrorKind::Parse,
            StructuredError::Validation { .. } => ErrorKind::Validation,
        }
    }

    pub fn backend(&self) -> &str {
        match self {
            StructuredError::Backend { backend, .. }
            | StructuredError::Parse { backend, .. }
            | StructuredError::Validation { backend, .. } => backend,
        }
    }

    /// Every schema violation, empty for other failure kinds.
    pub fn violations(&self) -> &[String] {
        match self {
            StructuredError::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}
