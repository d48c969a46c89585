use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::{Value, json};

use super::{Completion, GenerativeBackend};
use crate::adapters::{base_url, require};
use crate::error::ProviderError;
use crate::http::{ensure_success, read_json};
use crate::poll::{CompletionWaiter, JobHandle, JobStatus};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub assistant_id: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"***")
            .field("assistant_id", &self.assistant_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Assistants API backend: thread, user message, run, poll, read the
/// newest message.
pub struct OpenAiAssistant {
    api_key: String,
    assistant_id: String,
    base_url: String,
    client: reqwest::Client,
    waiter: CompletionWaiter,
}

impl OpenAiAssistant {
    pub fn new(
        config: OpenAiConfig,
        client: reqwest::Client,
        waiter: CompletionWaiter,
    ) -> Result<Self, ProviderError> {
        require(&config.api_key, "OpenAI API key")?;
        require(&config.assistant_id, "OpenAI assistant id")?;
        let base_url = base_url(&config.base_url, "OpenAI API URL")?;
        Ok(Self {
            api_key: config.api_key,
            assistant_id: config.assistant_id,
            base_url,
            client,
            waiter,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
            .json(&body)
            .send()
            .await?;
        read_json(ensure_success(resp).await?).await
    }

    async fn get(&self, path: &str) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
            .send()
            .await?;
        read_json(ensure_success(resp).await?).await
    }
}

fn id_of(value: &Value, what: &str) -> Result<String, ProviderError> {
    value["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| ProviderError::Upstream(format!("OpenAI {what} response has no id")))
}

impl GenerativeBackend for OpenAiAssistant {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            let thread = self.post("/threads", json!({})).await?;
            let thread_id = id_of(&thread, "thread")?;

            self.post(
                &format!("/threads/{thread_id}/messages"),
                json!({ "role": "user", "content": prompt }),
            )
            .await?;

            let run = self
                .post(
                    &format!("/threads/{thread_id}/runs"),
                    json!({ "assistant_id": self.assistant_id }),
                )
                .await?;
            let run_id = id_of(&run, "run")?;
            tracing::debug!(thread = %thread_id, run = %run_id, "OpenAI run started");

            let handle = RunHandle {
                backend: self,
                path: format!("/threads/{thread_id}/runs/{run_id}"),
            };
            let run = self.waiter.await_completion(&handle).await?;

            let messages = self.get(&format!("/threads/{thread_id}/messages")).await?;
            let text = newest_message_text(&messages)?;

            Ok(Completion {
                text,
                raw_response: json!({
                    "thread": thread,
                    "run": run,
                    "messages": messages["data"],
                }),
            })
        })
    }
}

/// One in-flight run, polled through the shared waiter.
struct RunHandle<'a> {
    backend: &'a OpenAiAssistant,
    path: String,
}

impl JobHandle for RunHandle<'_> {
    type Output = Value;

    fn poll_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<JobStatus<Value>, ProviderError>> + Send + '_>> {
        Box::pin(async move { Ok(run_status(self.backend.get(&self.path).await?)) })
    }
}

fn run_status(run: Value) -> JobStatus<Value> {
    let status = run["status"].as_str().unwrap_or_default().to_string();
    match status.as_str() {
        "completed" => JobStatus::Succeeded(run),
        "queued" | "cancelling" => JobStatus::Pending,
        "in_progress" => JobStatus::Running,
        "failed" | "cancelled" | "expired" | "incomplete" | "requires_action" => {
            let reason = run["last_error"]["message"]
                .as_str()
                .map(|m| format!("run {status}: {m}"))
                .unwrap_or_else(|| format!("run {status}"));
            JobStatus::Failed(Some(reason))
        }
        _ => JobStatus::Pending,
    }
}

/// Messages are listed newest first; take the first text block of the
/// newest one.
fn newest_message_text(messages: &Value) -> Result<String, ProviderError> {
    let block = &messages["data"][0]["content"][0];
    if block["type"] != "text" {
        return Err(ProviderError::Upstream(
            "OpenAI thread has no text reply".into(),
        ));
    }
    Ok(block["text"]["value"].as_str().unwrap_or_default().to_string())
}
