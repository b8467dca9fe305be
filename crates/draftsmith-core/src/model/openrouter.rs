//! OpenRouter-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::{BackendError, ChatMessage, CompletionBackend, CompletionRequest};
use crate::config::DraftConfig;

const REFERER: &str = "https://github.com/draftsmith";
const APP_TITLE: &str = "draftsmith";

/// Longest error body kept in [`BackendError::Api`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// HTTP backend posting to a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    endpoint: String,
    http_client: reqwest::Client,
}

impl OpenRouterBackend {
    /// Build a client with the configured endpoint and per-call timeout.
    pub fn new(config: &DraftConfig) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("draftsmith/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn request_body(request: &CompletionRequest) -> ChatCompletionBody<'_> {
    ChatCompletionBody {
        model: &request.backend,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        messages: request.messages(),
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn generated_text(completion: ChatCompletion) -> Result<String, BackendError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| {
            BackendError::InvalidResponse("missing choices[0].message.content".to_string())
        })
}

fn truncate(mut text: String) -> String {
    if let Some((idx, _)) = text.char_indices().nth(MAX_ERROR_BODY) {
        text.truncate(idx);
    }
    text
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &str,
    ) -> Result<String, BackendError> {
        debug!(endpoint = %self.endpoint, backend = %request.backend, "posting completion request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: truncate(message),
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        generated_text(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest::new("qwen/qwen3-coder:free", "sys", "usr");
        let body = serde_json::to_value(request_body(&request)).expect("serializes");
        assert_eq!(
            body,
            json!({
                "model": "qwen/qwen3-coder:free",
                "max_tokens": 4096,
                "temperature": 0.2,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ]
            })
        );
    }

    #[test]
    fn test_generated_text_extracted() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "gen-1",
            "choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}]
        }))
        .expect("decodes");
        assert_eq!(generated_text(completion).expect("text"), "{\"a\": 1}");
    }

    #[test]
    fn test_missing_choices_is_invalid_response() {
        let completion: ChatCompletion =
            serde_json::from_value(json!({"error": {"message": "nope"}})).expect("decodes");
        assert!(matches!(
            generated_text(completion),
            Err(BackendError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_null_content_is_invalid_response() {
        let completion: ChatCompletion =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]}))
                .expect("decodes");
        assert!(generated_text(completion).is_err());
    }

    #[test]
    fn test_truncate_long_error_body() {
        let long = "x".repeat(MAX_ERROR_BODY + 100);
        assert_eq!(truncate(long).len(), MAX_ERROR_BODY);
        assert_eq!(truncate("short".to_string()), "short");
    }

    #[tokio::test]
    async fn test_transport_failure_is_http_error() {
        let config = DraftConfig::default()
            .with_endpoint("http://127.0.0.1:1/v1/chat/completions")
            .with_timeout_secs(2);
        let backend = OpenRouterBackend::new(&config).expect("client builds");
        assert_eq!(backend.endpoint(), "http://127.0.0.1:1/v1/chat/completions");

        let request = CompletionRequest::new("m", "sys", "usr");
        let err = backend.complete(&request, "key").await.unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
    }
}
