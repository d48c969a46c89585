//! Structured extraction: free text in, schema-checked transactions out.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{ProviderError, StructuredError};
use crate::generative::anthropic::AnthropicMessages;
use crate::generative::openai::OpenAiAssistant;
use crate::generative::{Completion, GenerativeBackend, GenerativeKind};
use crate::schema::validate_transactions;
use crate::{Config, Transaction, TransactionsSchema};

/// Greedy span from the first `{` to the last `}`. Tolerates commentary
/// around a single JSON object; two unrelated objects in one reply are
/// captured together and fail to parse.
static JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

const PROMPT_TEMPLATE: &str = r#"Please read the content below and extract transaction details. Return ONLY the JSON data without any additional text or explanation:
{
  "transactions": [
    {
      "date": "yyyy-mm-dd",
      "type": "Buy/Sell",
      "stock_name": "string",
      "amount": 0,
      "price": 0.0,
      "currency": "string"
    }
  ]
}

Transaction details:
"#;

/// The instruction prompt for `text`. Deterministic: the same text always
/// yields the same prompt.
pub fn build_prompt(text: &str) -> String {
    format!("{PROMPT_TEMPLATE}{text}")
}

/// Locate the JSON object inside a model reply.
pub fn extract_json_span(reply: &str) -> Option<&str> {
    JSON_SPAN.find(reply).map(|m| m.as_str())
}

/// Turns extracted text into validated [`Transaction`] records through one
/// generative backend.
#[derive(Clone)]
pub struct StructuredExtractor {
    backend: Arc<dyn GenerativeBackend>,
}

impl StructuredExtractor {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Build the extractor for `kind` from its config section.
    pub fn from_config(config: &Config, kind: GenerativeKind) -> Result<Self, StructuredError> {
        let configuration_error = |message: String| StructuredError::Backend {
            backend: kind.name().to_string(),
            source: ProviderError::Configuration(message),
        };
        config
            .validate()
            .map_err(|e| configuration_error(e.message().to_string()))?;
        let client = config.http_client();
        let backend: Arc<dyn GenerativeBackend> = match kind {
            GenerativeKind::Anthropic => {
                let section = config
                    .anthropic
                    .clone()
                    .ok_or_else(|| configuration_error("anthropic is not configured".into()))?;
                Arc::new(AnthropicMessages::new(section, client).map_err(|source| {
                    StructuredError::Backend {
                        backend: kind.name().to_string(),
                        source,
                    }
                })?)
            }
            GenerativeKind::OpenAi => {
                let section = config
                    .openai
                    .clone()
                    .ok_or_else(|| configuration_error("openai is not configured".into()))?;
                Arc::new(
                    OpenAiAssistant::new(section, client, config.polling.waiter()).map_err(
                        |source| StructuredError::Backend {
                            backend: kind.name().to_string(),
                            source,
                        },
                    )?,
                )
            }
        };
        Ok(Self::new(backend))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Send `text` unchanged and return the raw reply, without locating or
    /// validating any JSON.
    pub async fn complete(&self, text: &str) -> Result<Completion, StructuredError> {
        self.backend
            .complete(text)
            .await
            .map_err(|source| StructuredError::Backend {
                backend: self.backend.name().to_string(),
                source,
            })
    }

    /// Extract transactions from `text` with exactly one backend call.
    ///
    /// Values are returned as the model produced them; nothing is coerced,
    /// rounded or normalised.
    pub async fn parse_transactions(&self, text: &str) -> Result<Vec<Transaction>, StructuredError> {
        let backend = self.backend.name().to_string();
        let prompt = build_prompt(text);
        tracing::debug!(backend = %backend, chars = text.len(), "requesting structured extraction");

        let completion = self.complete(&prompt).await?;
        let reply = completion.text.trim();

        let span = extract_json_span(reply).ok_or_else(|| StructuredError::Parse {
            backend: backend.clone(),
            message: "no JSON found in response".into(),
        })?;

        let value: Value = serde_json::from_str(span).map_err(|e| StructuredError::Parse {
            backend: backend.clone(),
            message: format!("invalid JSON: {e}"),
        })?;

        validate_transactions(&value).map_err(|violations| StructuredError::Validation {
            backend: backend.clone(),
            violations,
        })?;

        let parsed: TransactionsSchema =
            serde_json::from_value(value).map_err(|e| StructuredError::Parse {
                backend: backend.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(backend = %backend, count = parsed.transactions.len(), "parsed transactions");
        Ok(parsed.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::generative::mock::MockGenerative;

    fn extractor(mock: &Arc<MockGenerative>) -> StructuredExtractor {
        StructuredExtractor::new(mock.clone())
    }

    #[test]
    fn prompt_embeds_text_after_template() {
        let prompt = build_prompt("BUY ACME 10");
        assert!(prompt.starts_with("Please read the content below"));
        assert!(prompt.contains("\"stock_name\": \"string\""));
        assert!(prompt.ends_with("Transaction details:\nBUY ACME 10"));
        assert_eq!(prompt, build_prompt("BUY ACME 10"));
    }

    #[test]
    fn span_is_greedy() {
        assert_eq!(
            extract_json_span("Here you go:\n{\"transactions\":[]}\nHope that helps"),
            Some("{\"transactions\":[]}")
        );
        assert_eq!(extract_json_span("{\"a\":{\"b\":1}} and {}"), Some("{\"a\":{\"b\":1}} and {}"));
        assert_eq!(extract_json_span("no braces here"), None);
        assert_eq!(extract_json_span("} backwards {"), None);
    }

    #[tokio::test]
    async fn exact_reply_yields_one_transaction() {
        let mock = Arc::new(MockGenerative::reply(
            r#"{"transactions":[{"date":"2024-01-05","type":"Buy","stock_name":"ACME","amount":10,"price":25.5,"currency":"USD"}]}"#,
        ));
        let txs = extractor(&mock).parse_transactions("statement").await.unwrap();

        assert_eq!(
            txs,
            vec![Transaction {
                date: "2024-01-05".into(),
                kind: "Buy".into(),
                stock_name: "ACME".into(),
                amount: 10.into(),
                price: serde_json::Number::from_f64(25.5).unwrap(),
                currency: "USD".into(),
            }]
        );
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.prompts()[0], build_prompt("statement"));
    }

    #[tokio::test]
    async fn numbers_pass_through_unchanged() {
        let mock = Arc::new(MockGenerative::reply(
            r#"{"transactions":[{"date":"2024-01-05","type":"Buy","stock_name":"ACME","amount":10,"price":9007199254740993,"currency":"USD"}]}"#,
        ));
        let txs = extractor(&mock).parse_transactions("x").await.unwrap();

        let out = serde_json::to_string(&txs[0]).unwrap();
        assert!(out.contains(r#""amount":10,"#));
        assert!(out.contains(r#""price":9007199254740993,"#));
        assert_eq!(txs[0].price.as_u64(), Some(9_007_199_254_740_993));
    }

    #[tokio::test]
    async fn commentary_is_tolerated() {
        let mock = Arc::new(MockGenerative::reply(
            "Here you go:\n{\"transactions\":[]}\nHope that helps",
        ));
        let txs = extractor(&mock).parse_transactions("x").await.unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn no_json_is_parse_error() {
        let mock = Arc::new(MockGenerative::reply("I could not find any transactions."));
        let err = extractor(&mock).parse_transactions("x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("no JSON found"));
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let mock = Arc::new(MockGenerative::reply("{\"transactions\": [}"));
        let err = extractor(&mock).parse_transactions("x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn missing_amount_is_validation_error() {
        let mock = Arc::new(MockGenerative::reply(
            r#"{"transactions":[{"date":"2024-01-05","type":"Buy","stock_name":"ACME","price":25.5,"currency":"USD"}]}"#,
        ));
        let err = extractor(&mock).parse_transactions("x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.violations().iter().any(|v| v.contains("amount")));
    }

    #[tokio::test]
    async fn no_retry_after_failure() {
        let mock = Arc::new(MockGenerative::with_sequence(vec![
            Ok("not json".into()),
            Ok("{\"transactions\":[]}".into()),
        ]));
        assert!(extractor(&mock).parse_transactions("x").await.is_err());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn backend_failure_keeps_its_kind() {
        let mock = Arc::new(MockGenerative::failing(ProviderError::Upstream(
            "job failed: run failed: rate limited".into(),
        )));
        let err = extractor(&mock).parse_transactions("x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.backend(), "mock");
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn returned_records_revalidate() {
        let mock = Arc::new(MockGenerative::reply(
            r#"{"transactions":[{"date":"2024-02-01","type":"Sell","stock_name":"Globex","amount":3,"price":101.25,"currency":"EUR"},{"date":"2024-02-02","type":"Buy","stock_name":"Initech","amount":1.5,"price":7,"currency":"GBP"}]}"#,
        ));
        let txs = extractor(&mock).parse_transactions("x").await.unwrap();
        let again = serde_json::to_value(TransactionsSchema { transactions: txs }).unwrap();
        assert!(validate_transactions(&again).is_ok());
    }

    #[tokio::test]
    async fn complete_sends_text_unchanged() {
        let mock = Arc::new(MockGenerative::reply("free text"));
        let completion = extractor(&mock).complete("raw input").await.unwrap();
        assert_eq!(completion.text, "free text");
        assert_eq!(mock.prompts(), vec!["raw input".to_string()]);
    }

    #[test]
    fn unconfigured_backend_is_configuration_error() {
        let err = StructuredExtractor::from_config(&Config::default(), GenerativeKind::OpenAi)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.backend(), "openai");
    }

    #[test]
    fn zero_poll_interval_is_configuration_error() {
        let config = Config {
            openai: Some(crate::OpenAiConfig::new("sk-openai", "asst_1")),
            polling: crate::PollingConfig {
                interval_ms: 0,
                max_wait_secs: 0,
            },
            ..Config::default()
        };
        let err = StructuredExtractor::from_config(&config, GenerativeKind::OpenAi)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("interval_ms"));
    }
}
