//! Sequential first-success fallback across backend identifiers.

use std::fmt;
use std::sync::Arc;

use crate::contract::{self, ContractError, Document};
use crate::domain::StructuredChangeProposal;
use crate::obs;
use crate::sanitize::{self, SanitizeError};

use super::backend::{BackendError, CompletionBackend, CompletionRequest};

/// Why a single attempt failed. Never escapes the fallback loop on its own.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("no JSON object found in model response")]
    NoDocumentFound,

    #[error("schema validation failed: {}", .0.join("; "))]
    SchemaInvalid(Vec<String>),

    #[error("proposal decode failed: {0}")]
    ProposalDecode(String),
}

impl From<SanitizeError> for AttemptError {
    fn from(err: SanitizeError) -> Self {
        match err {
            SanitizeError::NoDocumentFound => AttemptError::NoDocumentFound,
        }
    }
}

impl From<ContractError> for AttemptError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::SchemaInvalid(errors) => AttemptError::SchemaInvalid(errors),
            ContractError::Decode(msg) => AttemptError::ProposalDecode(msg),
        }
    }
}

/// A swallowed per-attempt failure, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    pub backend: String,
    pub error: AttemptError,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.error)
    }
}

/// Fatal orchestrator errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("missing credential for the completion endpoint (set OPENROUTER_API_KEY)")]
    MissingCredential,

    #[error("all {attempted} models failed to produce a valid response")]
    AllModelsFailed {
        attempted: usize,
        failures: Vec<AttemptFailure>,
    },
}

/// The winning attempt.
///
/// Only a document that passed the contract is returned, so `valid` is always
/// `true` and `errors` always empty. Rejected attempts are kept in
/// `prior_failures`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCallResult {
    /// Backend identifier that produced the document.
    pub backend: String,
    pub raw_text: String,
    /// Sanitized and defaulted document.
    pub document: Document,
    /// Validity flag of `document`; `true` for every returned result.
    pub valid: bool,
    /// Validation errors of `document`; always empty.
    pub errors: Vec<String>,
    pub proposal: StructuredChangeProposal,
    /// 1-based position of the backend in the chain.
    pub attempt: usize,
    /// Failures of the backends tried before this one.
    pub prior_failures: Vec<AttemptFailure>,
}

/// Runs the fallback chain against one [`CompletionBackend`].
#[derive(Clone)]
pub struct ModelOrchestrator {
    backend: Arc<dyn CompletionBackend>,
}

impl fmt::Debug for ModelOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOrchestrator")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl ModelOrchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Try each identifier in `backends` in order; the first schema-valid
    /// document wins and no further calls are made.
    ///
    /// Fails with [`ModelError::MissingCredential`] before any call when the
    /// credential is absent or blank, and with [`ModelError::AllModelsFailed`]
    /// once the chain is exhausted.
    pub async fn call_with_fallback(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        backends: &[String],
        credential: Option<&str>,
    ) -> Result<ModelCallResult, ModelError> {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ModelError::MissingCredential)?;

        let mut failures: Vec<AttemptFailure> = Vec::new();

        for (index, backend) in backends.iter().enumerate() {
            let attempt = index + 1;
            obs::emit_attempt_started(backend, attempt);

            let request = CompletionRequest::new(backend.as_str(), system_prompt, user_prompt);
            match self.attempt(&request, credential).await {
                Ok(mut result) => {
                    obs::emit_backend_selected(backend, attempt);
                    result.attempt = attempt;
                    result.prior_failures = failures;
                    return Ok(result);
                }
                Err(error) => {
                    obs::emit_attempt_failed(backend, attempt, &error);
                    failures.push(AttemptFailure {
                        backend: backend.clone(),
                        error,
                    });
                }
            }
        }

        Err(ModelError::AllModelsFailed {
            attempted: backends.len(),
            failures,
        })
    }

    /// One request: generate, sanitize, default, validate, decode.
    async fn attempt(
        &self,
        request: &CompletionRequest,
        credential: &str,
    ) -> Result<ModelCallResult, AttemptError> {
        let raw_text = self.backend.complete(request, credential).await?;
        let document = contract::fill_defaults(sanitize::extract_document(&raw_text)?);
        let proposal = contract::into_proposal(document.clone())?;

        Ok(ModelCallResult {
            backend: request.backend.clone(),
            raw_text,
            document,
            valid: true,
            errors: Vec::new(),
            proposal,
            attempt: 0,
            prior_failures: Vec::new(),
        })
    }
}
