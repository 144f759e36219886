use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::AiSettings;
use crate::db::types::FailureKind;

/// Typed outcome of a failed model round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum AiError {
    /// Nothing usable came back: transport error, timeout, non-2xx status,
    /// missing or unparsable content.
    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(String),
    /// A JSON payload came back but does not match the expected shape.
    #[error("AI response violates schema: {0}")]
    SchemaViolation(String),
}

impl AiError {
    pub(crate) fn kind(&self) -> FailureKind {
        match self {
            Self::ServiceUnavailable(_) => FailureKind::ServiceUnavailable,
            Self::SchemaViolation(_) => FailureKind::SchemaViolation,
        }
    }

    pub(crate) fn message(&self) -> &str {
        match self {
            Self::ServiceUnavailable(message) | Self::SchemaViolation(message) => message,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ChatRequest {
    pub(crate) model: String,
    pub(crate) temperature: f64,
    pub(crate) system_prompt: &'static str,
    pub(crate) user_content: Value,
    pub(crate) schema_name: &'static str,
    pub(crate) schema: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct ChatReply {
    pub(crate) content: Value,
    pub(crate) tokens_used: Option<u64>,
}

/// Minimal OpenAI-compatible `/chat/completions` client shared by grading and
/// content generation. One attempt per call; callers decide what a failure
/// means for their records.
#[derive(Debug, Clone)]
pub(crate) struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl ChatClient {
    pub(crate) fn from_settings(settings: &AiSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.ai_connect_timeout))
            .timeout(Duration::from_secs(settings.ai_request_timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.openai_api_key.clone(),
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            max_tokens: settings.ai_max_tokens,
        })
    }

    pub(crate) async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, AiError> {
        let payload = json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_content}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": request.temperature,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "schema": request.schema,
                }
            }
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                let reason = if err.is_timeout() { "request timed out" } else { "transport error" };
                AiError::ServiceUnavailable(format!("{reason}: {err}"))
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(AiError::ServiceUnavailable(format!(
                "upstream returned {status}: {}",
                truncate(&body.to_string(), 300)
            )));
        }

        let text = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AiError::ServiceUnavailable("response has no content".to_string()))?;

        let content: Value = serde_json::from_str(strip_code_fences(text)).map_err(|err| {
            AiError::ServiceUnavailable(format!("response content is not JSON: {err}"))
        })?;

        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(|value| value.as_u64());

        Ok(ChatReply { content, tokens_used })
    }
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}


#[cfg(test)]
mod tests {
    use super::stub::{spawn, StubBehaviour};
    use super::*;
    use axum::http::StatusCode;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "grader-test".to_string(),
            temperature: 0.1,
            system_prompt: "system",
            user_content: json!([{"type": "text", "text": "hello"}]),
            schema_name: "probe",
            schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn sends_bearer_schema_and_temperature() {
        let behaviour = StubBehaviour::content("{\"ok\":true}");
        let seen = behaviour.last_request.clone();
        let settings = spawn(behaviour, 5).await;
        let client = ChatClient::from_settings(&settings).expect("client");

        let reply = client.complete(&request()).await.expect("reply");

        assert_eq!(reply.content, json!({"ok": true}));
        assert_eq!(reply.tokens_used, Some(321));
        let payload = seen.lock().unwrap().clone().expect("payload recorded");
        assert_eq!(payload["model"], "grader-test");
        assert_eq!(payload["temperature"], 0.1);
        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(payload["response_format"]["json_schema"]["name"], "probe");
    }

    #[tokio::test]
    async fn non_success_status_is_service_unavailable() {
        let settings = spawn(
            StubBehaviour::replying(StatusCode::TOO_MANY_REQUESTS, json!({"error": "slow down"})),
            5,
        )
        .await;
        let client = ChatClient::from_settings(&settings).expect("client");

        let error = client.complete(&request()).await.unwrap_err();

        assert_eq!(error.kind(), FailureKind::ServiceUnavailable);
        assert!(error.message().contains("429"), "{error}");
    }

    #[tokio::test]
    async fn non_json_content_is_service_unavailable() {
        let settings = spawn(StubBehaviour::content("Xin lỗi, tôi không thể chấm bài này."), 5).await;
        let client = ChatClient::from_settings(&settings).expect("client");

        let error = client.complete(&request()).await.unwrap_err();

        assert!(matches!(error, AiError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_service_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let mut settings = spawn(StubBehaviour::content("{}"), 5).await;
        settings.openai_base_url = format!("http://{addr}/v1");
        let client = ChatClient::from_settings(&settings).expect("client");

        let error = client.complete(&request()).await.unwrap_err();

        assert!(matches!(error, AiError::ServiceUnavailable(_)));
    }
}
