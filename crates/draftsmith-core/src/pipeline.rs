//! End-to-end invocation: prompt, fallback chain, review, rendering.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::DraftConfig;
use crate::domain::{IssueContext, StructuredChangeProposal};
use crate::model::{BackendError, CompletionBackend, ModelError, ModelOrchestrator, OpenRouterBackend};
use crate::obs;
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::render::{render_change_body, render_email, RenderedEmail};
use crate::review::{HeuristicReviewer, ReviewOutcome};

/// Terminal artifact of one invocation.
///
/// # Invariants
///
/// When `success` is false, no proposal, review or rendered output is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    /// Backend identifier that produced the proposal.
    pub model_used: Option<String>,
    pub proposal: Option<StructuredChangeProposal>,
    pub pr_title: String,
    pub pr_body: String,
    pub email: Option<RenderedEmail>,
    pub review: Option<ReviewOutcome>,
    pub errors: Vec<String>,
    pub invocation_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 (hex) over the system and user prompts.
    pub prompt_digest: String,
}

impl PipelineResult {
    fn failed(invocation_id: Uuid, prompt_digest: String, errors: Vec<String>) -> Self {
        Self {
            success: false,
            model_used: None,
            proposal: None,
            pr_title: String::new(),
            pr_body: String::new(),
            email: None,
            review: None,
            errors,
            invocation_id,
            generated_at: Utc::now(),
            prompt_digest,
        }
    }

    /// Flat report consumed by downstream automation.
    pub fn to_report(&self) -> Value {
        json!({
            "success": self.success,
            "model_used": self.model_used.as_deref().unwrap_or(""),
            "pipeline_output": self
                .proposal
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok())
                .unwrap_or_else(|| json!({})),
            "pr_title": self.pr_title,
            "pr_body": self.pr_body,
            "email": self
                .email
                .as_ref()
                .map(|e| json!({"subject": e.subject, "body": e.body}))
                .unwrap_or_else(|| json!({})),
            "review_summary": self.review.as_ref().map(ReviewOutcome::summary).unwrap_or_default(),
            "review_passed": self.review.as_ref().is_some_and(|r| r.passed),
            "errors": self.errors,
            "invocation_id": self.invocation_id.to_string(),
            "generated_at": self.generated_at.to_rfc3339(),
            "prompt_digest": self.prompt_digest,
        })
    }

    /// [`Self::to_report`] as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_report())
    }
}

/// Deterministic digest of the prompts sent to the backends.
pub fn prompt_digest(system_prompt: &str, user_prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(system_prompt.as_bytes());
    hasher.update([0u8]);
    hasher.update(user_prompt.as_bytes());
    hex::encode(hasher.finalize())
}

/// A configured pipeline.
///
/// Holds no per-invocation state, so one instance can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct DraftPipeline {
    orchestrator: ModelOrchestrator,
    backends: Vec<String>,
    reviewer: Arc<HeuristicReviewer>,
}

impl DraftPipeline {
    /// Pipeline over `backend` with the given chain and the standard reviewer.
    pub fn new(backend: Arc<dyn CompletionBackend>, backends: Vec<String>) -> Self {
        Self {
            orchestrator: ModelOrchestrator::new(backend),
            backends,
            reviewer: Arc::new(HeuristicReviewer::standard()),
        }
    }

    /// Pipeline over the HTTP backend described by `config`.
    pub fn from_config(config: &DraftConfig) -> Result<Self, BackendError> {
        let backend = OpenRouterBackend::new(config)?;
        Ok(Self::new(Arc::new(backend), config.backends.clone()))
    }

    pub fn with_reviewer(mut self, reviewer: HeuristicReviewer) -> Self {
        self.reviewer = Arc::new(reviewer);
        self
    }

    pub fn backends(&self) -> &[String] {
        &self.backends
    }

    /// Run one invocation. Never fails: the outcome is in [`PipelineResult::success`].
    pub async fn run(&self, issue: &IssueContext, credential: Option<&str>) -> PipelineResult {
        let invocation_id = Uuid::new_v4();
        let span = obs::pipeline_span(&invocation_id.to_string());
        self.run_inner(invocation_id, issue, credential)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        invocation_id: Uuid,
        issue: &IssueContext,
        credential: Option<&str>,
    ) -> PipelineResult {
        let started = Instant::now();
        let user_prompt = build_user_prompt(issue);
        let digest = prompt_digest(SYSTEM_PROMPT, &user_prompt);

        let call = match self
            .orchestrator
            .call_with_fallback(SYSTEM_PROMPT, &user_prompt, &self.backends, credential)
            .await
        {
            Ok(call) => call,
            Err(err) => {
                let mut errors = vec![err.to_string()];
                if let ModelError::AllModelsFailed { failures, .. } = &err {
                    errors.extend(failures.iter().map(ToString::to_string));
                }
                obs::emit_pipeline_finished(false, None, elapsed_ms(started));
                return PipelineResult::failed(invocation_id, digest, errors);
            }
        };

        let proposal = call.proposal;
        let review = self.reviewer.review(&proposal);
        obs::emit_review_completed(review.passed, review.warnings.len(), review.blockers.len());

        let summary = review.summary();
        let pr_body = render_change_body(&proposal, Some(&summary));
        let email = render_email(&proposal, Some(issue.issue_url_or_placeholder()), None, None);

        obs::emit_pipeline_finished(true, Some(&call.backend), elapsed_ms(started));

        PipelineResult {
            success: true,
            model_used: Some(call.backend),
            pr_title: proposal.draft_pr_title.clone(),
            pr_body,
            email: Some(email),
            review: Some(review),
            errors: call.prior_failures.iter().map(ToString::to_string).collect(),
            proposal: Some(proposal),
            invocation_id,
            generated_at: Utc::now(),
            prompt_digest: digest,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptedBackend;

    fn valid_output() -> String {
        json!({
            "problem_summary": "Users cannot reset their password.",
            "implementation_plan": ["Fix token expiry check"],
            "tasks": ["Patch reset handler"],
            "files_to_edit": ["src/auth/reset.rs"],
            "tests_to_add_or_run": ["cargo test reset"],
            "risk_notes": [],
            "draft_pr_title": "fix(auth): password reset",
            "draft_pr_body": "## Context\nReset tokens expire early.",
            "draft_email_subject": "[Draft PR] fix(auth): password reset",
            "draft_email_body": "Draft ready for {{issue_url}}: {{pr_url}}"
        })
        .to_string()
    }

    fn pipeline(fake: ScriptedBackend, chain: &[&str]) -> DraftPipeline {
        DraftPipeline::new(
            Arc::new(fake),
            chain.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_success_populates_result() {
        let p = pipeline(ScriptedBackend::new().with_text("a", valid_output()), &["a"]);
        let issue = IssueContext::new("Reset broken", "Tokens expire")
            .with_issue_url("https://github.com/org/repo/issues/7");

        let result = p.run(&issue, Some("key")).await;
        assert!(result.success);
        assert_eq!(result.model_used.as_deref(), Some("a"));
        assert_eq!(result.pr_title, "fix(auth): password reset");
        assert!(result.pr_body.contains("## Automated Review"));
        assert!(result.errors.is_empty());

        let email = result.email.expect("email rendered");
        assert!(email.body.contains("https://github.com/org/repo/issues/7"));
        assert!(email.body.contains("{{pr_url}}"));
        assert!(result.review.expect("reviewed").passed);
    }

    #[tokio::test]
    async fn test_failure_skips_rendering() {
        let p = pipeline(
            ScriptedBackend::new().with_failure("a", BackendError::Http("refused".into())),
            &["a"],
        );
        let result = p.run(&IssueContext::new("T", "B"), Some("key")).await;

        assert!(!result.success);
        assert!(result.proposal.is_none());
        assert!(result.email.is_none());
        assert!(result.review.is_none());
        assert!(result.pr_body.is_empty());
        assert_eq!(
            result.errors,
            vec![
                "all 1 models failed to produce a valid response".to_string(),
                "a: transport error: refused".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_credential_reported() {
        let p = pipeline(ScriptedBackend::new(), &["a"]);
        let result = p.run(&IssueContext::new("T", "B"), None).await;
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("OPENROUTER_API_KEY"));
    }

    #[tokio::test]
    async fn test_report_keys_on_failure() {
        let p = pipeline(ScriptedBackend::new(), &[]);
        let report = p.run(&IssueContext::new("T", "B"), Some("k")).await.to_report();
        assert_eq!(report["success"], false);
        assert_eq!(report["model_used"], "");
        assert_eq!(report["pipeline_output"], json!({}));
        assert_eq!(report["email"], json!({}));
        assert_eq!(report["review_summary"], "");
        assert_eq!(report["review_passed"], false);
    }

    #[test]
    fn test_prompt_digest_is_stable() {
        let a = prompt_digest("sys", "usr");
        assert_eq!(a, prompt_digest("sys", "usr"));
        assert_ne!(a, prompt_digest("sy", "susr"));
        assert_eq!(a.len(), 64);
    }
}
