//! In-memory completion backend (testing only).
//!
//! `ScriptedBackend` answers each backend identifier from its own queue of
//! scripted replies and records every request it receives.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::backend::{BackendError, CompletionBackend, CompletionRequest};

/// A canned reply for one call.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(BackendError),
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub request: CompletionRequest,
    pub credential: String,
}

/// Fake backend driven by per-identifier reply queues.
///
/// Replies are consumed in order. The last reply of a queue is repeated once
/// the queue is down to one entry. Identifiers without a script fail with a
/// 404 [`BackendError::Api`].
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `backend`.
    pub fn with_reply(self, backend: &str, reply: ScriptedReply) -> Self {
        lock(&self.scripts)
            .entry(backend.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue generated text for `backend`.
    pub fn with_text(self, backend: &str, text: impl Into<String>) -> Self {
        self.with_reply(backend, ScriptedReply::Text(text.into()))
    }

    /// Queue a failure for `backend`.
    pub fn with_failure(self, backend: &str, error: BackendError) -> Self {
        self.with_reply(backend, ScriptedReply::Fail(error))
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Backend identifiers called so far, in order.
    pub fn called_backends(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .map(|c| c.request.backend.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn next_reply(&self, backend: &str) -> Option<ScriptedReply> {
        let mut scripts = lock(&self.scripts);
        let queue = scripts.get_mut(backend)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &str,
    ) -> Result<String, BackendError> {
        lock(&self.calls).push(RecordedCall {
            request: request.clone(),
            credential: credential.to_string(),
        });

        match self.next_reply(&request.backend) {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(err)) => Err(err),
            None => Err(BackendError::Api {
                status: 404,
                message: format!("no script for backend '{}'", request.backend),
            }),
        }
    }
}
