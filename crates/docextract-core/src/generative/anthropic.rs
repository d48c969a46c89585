use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::json;

use super::{Completion, GenerativeBackend, SYSTEM_INSTRUCTION};
use crate::adapters::{base_url, require};
use crate::error::ProviderError;
use crate::http::{ensure_success, read_json};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const API_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Single-shot Messages API backend.
pub struct AnthropicMessages {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicMessages {
    pub fn new(config: AnthropicConfig, client: reqwest::Client) -> Result<Self, ProviderError> {
        require(&config.api_key, "Anthropic API key")?;
        require(&config.model, "Anthropic model")?;
        if config.max_tokens == 0 {
            return Err(ProviderError::Configuration(
                "Anthropic max_tokens must be positive".into(),
            ));
        }
        let base_url = base_url(&config.base_url, "Anthropic API URL")?;
        Ok(Self {
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
            base_url,
            client,
        })
    }
}

impl GenerativeBackend for AnthropicMessages {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending Anthropic request");
            let resp = self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": self.max_tokens,
                    "system": SYSTEM_INSTRUCTION,
                    "messages": [{ "role": "user", "content": prompt }],
                }))
                .send()
                .await?;
            let body = read_json(ensure_success(resp).await?).await?;

            let first = &body["content"][0];
            if first["type"] != "text" {
                return Err(ProviderError::Upstream(format!(
                    "unexpected Anthropic content type: {}",
                    first["type"].as_str().unwrap_or("none")
                )));
            }
            let text = first["text"].as_str().unwrap_or_default().to_string();

            Ok(Completion {
                text,
                raw_response: body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_api_key() {
        let err = AnthropicMessages::new(AnthropicConfig::new(""), reqwest::Client::new())
            .err()
            .unwrap();
        assert!(err.message().contains("Anthropic API key"));
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let mut config = AnthropicConfig::new("sk-ant");
        config.max_tokens = 0;
        assert!(AnthropicMessages::new(config, reqwest::Client::new()).is_err());
    }

    #[test]
    fn debug_redacts_key() {
        assert!(!format!("{:?}", AnthropicConfig::new("sk-ant-secret")).contains("secret"));
    }

    #[tokio::test]
    async fn sends_messages_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant")
            .match_header("anthropic-version", API_VERSION)
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": DEFAULT_MODEL,
                "max_tokens": 1024,
                "system": SYSTEM_INSTRUCTION,
            })))
            .with_status(200)
            .with_body(r#"{"id":"msg_1","content":[{"type":"text","text":"{\"transactions\":[]}"}]}"#)
            .create_async()
            .await;

        let mut config = AnthropicConfig::new("sk-ant");
        config.base_url = server.url();
        let backend = AnthropicMessages::new(config, reqwest::Client::new()).unwrap();
        let completion = backend.complete("prompt").await.unwrap();

        assert_eq!(completion.text, r#"{"transactions":[]}"#);
        assert_eq!(completion.raw_response["id"], "msg_1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_text_block_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"tool_use","id":"t1"}]}"#)
            .create_async()
            .await;

        let mut config = AnthropicConfig::new("sk-ant");
        config.base_url = server.url();
        let backend = AnthropicMessages::new(config, reqwest::Client::new()).unwrap();
        let err = backend.complete("prompt").await.unwrap_err();
        assert!(err.message().contains("tool_use"));
    }

    #[tokio::test]
    async fn api_error_message_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let mut config = AnthropicConfig::new("bad");
        config.base_url = server.url();
        let backend = AnthropicMessages::new(config, reqwest::Client::new()).unwrap();
        let err = backend.complete("prompt").await.unwrap_err();
        assert_eq!(err.message(), "HTTP 401 Unauthorized: invalid x-api-key");
    }
}
