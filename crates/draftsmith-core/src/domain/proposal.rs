//! The structured change proposal: the ten-field document a backend must produce.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::{fill_defaults, into_proposal, type_name};
use crate::domain::{DraftError, Result};

/// A validated change proposal.
///
/// # Invariants
///
/// Exactly these ten fields, all required. Instances are only produced from
/// documents that passed [`crate::contract::validate`], so list and length
/// constraints hold for anything built through the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredChangeProposal {
    /// One paragraph describing the problem.
    pub problem_summary: String,
    /// Ordered implementation steps.
    pub implementation_plan: Vec<String>,
    /// Granular checklist items.
    pub tasks: Vec<String>,
    /// File paths to create or modify.
    pub files_to_edit: Vec<String>,
    /// Test files or test commands.
    pub tests_to_add_or_run: Vec<String>,
    /// Security, breaking-change or migration warnings. May be empty.
    pub risk_notes: Vec<String>,
    pub draft_pr_title: String,
    pub draft_pr_body: String,
    pub draft_email_subject: String,
    pub draft_email_body: String,
}

impl StructuredChangeProposal {
    /// Load a proposal from a stored JSON value.
    ///
    /// Missing fields get their defaults, then the document must pass the
    /// contract. Any violation is reported as [`DraftError::InvalidProposal`].
    pub fn from_value(value: Value) -> Result<Self> {
        let doc = match value {
            Value::Object(doc) => doc,
            other => {
                return Err(DraftError::InvalidProposal(format!(
                    "expected a JSON object, found {}",
                    type_name(&other)
                )))
            }
        };
        into_proposal(fill_defaults(doc)).map_err(|e| DraftError::InvalidProposal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "problem_summary": "Users cannot log in when using SSO provider.",
            "implementation_plan": ["Add SAML handler", "Write integration test"],
            "tasks": ["Implement SAML endpoint"],
            "files_to_edit": ["src/auth/saml.rs"],
            "tests_to_add_or_run": ["cargo test saml"],
            "risk_notes": [],
            "draft_pr_title": "feat(auth): add SAML SSO support",
            "draft_pr_body": "## Context\nSSO login broken",
            "draft_email_subject": "[Draft PR] feat(auth): add SAML SSO support",
            "draft_email_body": "PR ready: {{pr_url}} for issue {{issue_url}}"
        })
    }

    #[test]
    fn test_decode_proposal() {
        let proposal = StructuredChangeProposal::from_value(sample()).expect("decodes");
        assert_eq!(proposal.implementation_plan.len(), 2);
        assert!(proposal.risk_notes.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut value = sample();
        value["extra_garbage"] = json!("oops");
        let err = StructuredChangeProposal::from_value(value).unwrap_err();
        assert!(matches!(err, DraftError::InvalidProposal(_)));
        assert!(err.to_string().contains("extra_garbage"));
    }

    #[test]
    fn test_missing_risk_notes_defaulted() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("risk_notes");
        let proposal = StructuredChangeProposal::from_value(value).expect("defaults fill the gap");
        assert!(proposal.risk_notes.is_empty());
    }

    #[test]
    fn test_short_summary_is_invalid_proposal() {
        let mut value = sample();
        value["problem_summary"] = json!("short");
        let err = StructuredChangeProposal::from_value(value).unwrap_err();
        assert!(matches!(err, DraftError::InvalidProposal(_)));
        assert!(err.to_string().contains("[problem_summary]"));
    }

    #[test]
    fn test_non_object_is_invalid_proposal() {
        let err = StructuredChangeProposal::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, DraftError::InvalidProposal(_)));
        assert!(err.to_string().contains("found array"));
    }
}
