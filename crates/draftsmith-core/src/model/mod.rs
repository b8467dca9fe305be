//! Completion backends and the fallback orchestrator.

pub mod backend;
pub mod fakes;
pub mod openrouter;
pub mod orchestrator;

pub use backend::{BackendError, ChatMessage, CompletionBackend, CompletionRequest};
pub use fakes::{RecordedCall, ScriptedBackend, ScriptedReply};
pub use openrouter::OpenRouterBackend;
pub use orchestrator::{AttemptError, AttemptFailure, ModelCallResult, ModelError, ModelOrchestrator};

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f64 = 0.2;

/// Output token cap sent with every request.
pub const MAX_TOKENS: u32 = 4096;

/// Default completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default fallback chain, tried in order.
pub const DEFAULT_BACKENDS: [&str; 5] = [
    "qwen/qwen3-coder-480b-a35b:free",
    "qwen/qwen3-next-80b-a3b-instruct:free",
    "deepseek/deepseek-r1-0528:free",
    "stepfun/step-3.5-flash:free",
    "arcee/trinity-mini:free",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backends_are_free_tier() {
        assert!(DEFAULT_BACKENDS.len() >= 3);
        assert!(DEFAULT_BACKENDS.iter().all(|b| b.ends_with(":free")));
    }
}
