//! HTTP plumbing shared by every remote backend: client construction and
//! normalisation of non-success responses into [`ProviderError::Upstream`].

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::ProviderError;

/// Default per-request timeout for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the shared HTTP client. Safe to clone and reuse across calls.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Pass through 2xx responses; turn anything else into an upstream error
/// carrying the status and the backend's message when one can be found.
pub async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Upstream(describe_failure(status, &body)))
}

/// Read a JSON response body.
pub async fn read_json(resp: reqwest::Response) -> Result<Value, ProviderError> {
    resp.json::<Value>()
        .await
        .map_err(|e| ProviderError::Upstream(format!("invalid JSON response: {e}")))
}

/// Fetch a header as an owned string.
pub fn header_value(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

pub fn describe_failure(status: StatusCode, body: &str) -> String {
    match error_message(body) {
        Some(msg) => format!("HTTP {status}: {msg}"),
        None => format!("HTTP {status}"),
    }
}

/// Pull a human-readable message out of the common JSON error shapes
/// (`{"error": {"message"}}`, `{"error": "..."}`, `{"message"}`,
/// `{"error_description"}`, `{"Message"}`).
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let candidates = [
        &value["error"]["message"],
        &value["error_description"],
        &value["error"],
        &value["message"],
        &value["Message"],
    ];
    candidates
        .into_iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> reqwest::Response {
        let http_resp = http::Response::builder().status(status).body(body).unwrap();
        reqwest::Response::from(http_resp)
    }

    #[tokio::test]
    async fn success_passes_through() {
        let resp = ensure_success(response(200, "{}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn nested_error_message() {
        let err = ensure_success(response(
            400,
            r#"{"error":{"code":"InvalidRequest","message":"Invalid request."}}"#,
        ))
        .await
        .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Upstream("HTTP 400 Bad Request: Invalid request.".into())
        );
    }

    #[tokio::test]
    async fn aws_style_message() {
        let err = ensure_success(response(
            403,
            r#"{"__type":"AccessDeniedException","Message":"not authorized"}"#,
        ))
        .await
        .unwrap_err();
        assert!(err.message().ends_with("not authorized"));
    }

    #[tokio::test]
    async fn non_json_body_keeps_status() {
        let err = ensure_success(response(502, "<html>bad gateway</html>"))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "HTTP 502 Bad Gateway");
    }

    #[test]
    fn oauth_error_description_preferred_over_code() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid JWT signature."}"#;
        assert_eq!(error_message(body).unwrap(), "Invalid JWT signature.");
    }

    #[test]
    fn plain_error_string() {
        assert_eq!(
            error_message(r#"{"error":"invalid_client"}"#).unwrap(),
            "invalid_client"
        );
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let http_resp = http::Response::builder()
            .status(202)
            .header("Operation-Location", "https://example.test/op/1")
            .body("")
            .unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert_eq!(
            header_value(&resp, "operation-location").as_deref(),
            Some("https://example.test/op/1")
        );
    }
}
