//! Completion backend abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{MAX_TOKENS, TEMPERATURE};

/// Errors from a single completion request.
///
/// All variants are per-attempt failures: the orchestrator records them and
/// moves on to the next backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Http(String),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Http(err.to_string())
    }
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A single request against one backend identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub backend: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Request with the fixed sampling parameters.
    pub fn new(
        backend: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }

    /// The two-message conversation: system then user.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: self.system_prompt.clone(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: self.user_prompt.clone(),
            },
        ]
    }
}

/// A text-generation endpoint.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Send `request` and return the generated text.
    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &str,
    ) -> Result<String, BackendError>;
}
