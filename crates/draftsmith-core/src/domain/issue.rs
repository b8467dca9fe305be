//! Issue context: the immutable input of one pipeline invocation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{DraftError, Result};

/// Issue title, body and optional design artifacts.
///
/// Built once per invocation and never mutated afterwards. Empty artifact
/// blocks are treated the same as absent ones by the prompt builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueContext {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub tasks: Option<String>,
    #[serde(default)]
    pub issue_url: Option<String>,
}

impl IssueContext {
    /// Create a context with only a title and body.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            spec: None,
            plan: None,
            tasks: None,
            issue_url: None,
        }
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    pub fn with_tasks(mut self, tasks: impl Into<String>) -> Self {
        self.tasks = Some(tasks.into());
        self
    }

    pub fn with_issue_url(mut self, url: impl Into<String>) -> Self {
        self.issue_url = Some(url.into());
        self
    }

    /// Build a context from a GitHub `issues` webhook payload.
    ///
    /// Reads `issue.title`, `issue.body` (null becomes empty) and
    /// `issue.html_url`.
    pub fn from_github_event(payload: &Value) -> Result<Self> {
        let issue = payload
            .get("issue")
            .and_then(Value::as_object)
            .ok_or_else(|| DraftError::InvalidIssue("payload has no 'issue' object".into()))?;

        let title = issue
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DraftError::InvalidIssue("issue.title must be a non-empty string".into()))?;

        let body = issue.get("body").and_then(Value::as_str).unwrap_or_default();
        let url = issue.get("html_url").and_then(Value::as_str);

        let mut ctx = Self::new(title, body);
        ctx.issue_url = url.map(str::to_string);
        Ok(ctx)
    }

    /// Build a context from either a webhook payload or a flat
    /// `{title, body, spec, plan, tasks, issue_url}` object.
    pub fn from_json_value(value: Value) -> Result<Self> {
        if value.get("issue").is_some() {
            return Self::from_github_event(&value);
        }

        let ctx: IssueContext = serde_json::from_value(value)?;
        if ctx.title.trim().is_empty() {
            return Err(DraftError::InvalidIssue("title must not be empty".into()));
        }
        Ok(ctx)
    }

    /// Load a context from a JSON file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)?;
        Self::from_json_value(value)
    }

    /// The issue URL, or the literal placeholder token when unknown.
    pub fn issue_url_or_placeholder(&self) -> &str {
        self.issue_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(crate::render::ISSUE_URL_PLACEHOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_sets_artifacts() {
        let ctx = IssueContext::new("Fix login", "SSO broken")
            .with_spec("spec text")
            .with_plan("plan text")
            .with_tasks("tasks text")
            .with_issue_url("https://github.com/org/repo/issues/7");

        assert_eq!(ctx.spec.as_deref(), Some("spec text"));
        assert_eq!(ctx.plan.as_deref(), Some("plan text"));
        assert_eq!(ctx.tasks.as_deref(), Some("tasks text"));
        assert_eq!(
            ctx.issue_url_or_placeholder(),
            "https://github.com/org/repo/issues/7"
        );
    }

    #[test]
    fn test_missing_url_keeps_placeholder() {
        let ctx = IssueContext::new("T", "B");
        assert_eq!(ctx.issue_url_or_placeholder(), "{{issue_url}}");
    }

    #[test]
    fn test_from_github_event() {
        let payload = json!({
            "action": "opened",
            "issue": {
                "title": "Search broken on mobile",
                "body": null,
                "html_url": "https://github.com/org/repo/issues/42"
            }
        });

        let ctx = IssueContext::from_github_event(&payload).expect("valid payload");
        assert_eq!(ctx.title, "Search broken on mobile");
        assert_eq!(ctx.body, "");
        assert_eq!(
            ctx.issue_url.as_deref(),
            Some("https://github.com/org/repo/issues/42")
        );
    }

    #[test]
    fn test_from_github_event_requires_title() {
        let payload = json!({ "issue": { "title": "  ", "body": "x" } });
        let err = IssueContext::from_github_event(&payload).unwrap_err();
        assert!(err.to_string().contains("issue.title"));
    }

    #[test]
    fn test_from_json_value_flat() {
        let value = json!({
            "title": "Add SAML",
            "body": "Users need SSO",
            "spec": "spec here"
        });

        let ctx = IssueContext::from_json_value(value).expect("flat issue");
        assert_eq!(ctx.title, "Add SAML");
        assert_eq!(ctx.spec.as_deref(), Some("spec here"));
        assert!(ctx.plan.is_none());
    }

    #[test]
    fn test_from_json_value_rejects_empty_title() {
        let err = IssueContext::from_json_value(json!({ "title": "" })).unwrap_err();
        assert!(matches!(err, DraftError::InvalidIssue(_)));
    }
}
