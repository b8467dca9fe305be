//! Draftsmith Core Library
//!
//! Turns an issue into a schema-conformant change proposal through an
//! ordered chain of completion backends, then reviews it and renders the
//! draft PR body and notification email.

pub mod config;
pub mod contract;
pub mod domain;
pub mod model;
pub mod obs;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod review;
pub mod sanitize;
pub mod telemetry;

pub use config::{credential_from_env, DraftConfig};

pub use contract::{
    contract_schema, fill_defaults, into_proposal, validate, ContractError, ContractVerdict,
    Document, CONTRACT_FIELDS,
};

pub use domain::{DraftError, IssueContext, Result, StructuredChangeProposal};

pub use model::{
    AttemptError, AttemptFailure, BackendError, CompletionBackend, CompletionRequest,
    ModelCallResult, ModelError, ModelOrchestrator, OpenRouterBackend, ScriptedBackend,
};

pub use pipeline::{DraftPipeline, PipelineResult};
pub use prompt::{build_user_prompt, SYSTEM_PROMPT};
pub use render::{render_change_body, render_email, RenderedEmail};
pub use review::{ChecklistEntry, HeuristicReviewer, ReviewOutcome, ReviewRule, RuleSeverity};
pub use sanitize::{extract_document, SanitizeError};
