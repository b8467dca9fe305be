//! Markdown PR body and notification email rendering.

use serde::{Deserialize, Serialize};

use crate::domain::StructuredChangeProposal;

pub const ISSUE_URL_PLACEHOLDER: &str = "{{issue_url}}";
pub const PR_URL_PLACEHOLDER: &str = "{{pr_url}}";
pub const CI_STATUS_PLACEHOLDER: &str = "{{ci_status}}";

/// Bodies shorter than this (after trimming) are replaced by a synthesized one.
pub const MIN_EMAIL_BODY_CHARS: usize = 10;

const NO_RISKS: &str = "_None identified._";

/// Rendered notification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Render the draft PR markdown body.
///
/// Sections are emitted in a fixed order: Context, Implementation Plan,
/// Files Touched, Tests, Risks, Checklist, then Automated Review when a
/// non-empty `review_summary` is supplied.
pub fn render_change_body(
    proposal: &StructuredChangeProposal,
    review_summary: Option<&str>,
) -> String {
    let plan = proposal
        .implementation_plan
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n");
    let files = code_bullets(&proposal.files_to_edit);
    let tests = code_bullets(&proposal.tests_to_add_or_run);
    let risks = if proposal.risk_notes.is_empty() {
        NO_RISKS.to_string()
    } else {
        proposal
            .risk_notes
            .iter()
            .map(|r| format!("- {}", r))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let checklist = proposal
        .tasks
        .iter()
        .map(|t| format!("- [ ] {}", t))
        .collect::<Vec<_>>()
        .join("\n");

    let mut sections = vec![
        format!("## Context\n\n{}", proposal.problem_summary),
        format!("## Implementation Plan\n\n{}", plan),
        format!("## Files Touched\n\n{}", files),
        format!("## Tests\n\n{}", tests),
        format!("## Risks\n\n{}", risks),
        format!("## Checklist\n\n{}", checklist),
    ];

    if let Some(summary) = review_summary.filter(|s| !s.is_empty()) {
        sections.push(format!("## Automated Review\n\n```\n{}\n```", summary));
    }

    sections.join("\n\n")
}

fn code_bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- `{}`", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the notification email, substituting the three placeholder tokens.
///
/// Missing values leave the literal token in place. A body that is too short
/// after substitution is replaced by a synthesized summary.
pub fn render_email(
    proposal: &StructuredChangeProposal,
    issue_url: Option<&str>,
    pr_url: Option<&str>,
    ci_status: Option<&str>,
) -> RenderedEmail {
    let issue_url = issue_url.unwrap_or(ISSUE_URL_PLACEHOLDER);
    let pr_url = pr_url.unwrap_or(PR_URL_PLACEHOLDER);
    let ci_status = ci_status.unwrap_or(CI_STATUS_PLACEHOLDER);

    let mut body = proposal
        .draft_email_body
        .replace(ISSUE_URL_PLACEHOLDER, issue_url)
        .replace(PR_URL_PLACEHOLDER, pr_url)
        .replace(CI_STATUS_PLACEHOLDER, ci_status);

    if body.trim().chars().count() < MIN_EMAIL_BODY_CHARS {
        body = format!(
            "A Draft PR has been created for: {}\n\n\
             Issue: {}\n\
             PR:    {}\n\
             CI:    {}\n\n\
             Summary: {}",
            proposal.draft_pr_title, issue_url, pr_url, ci_status, proposal.problem_summary
        );
    }

    RenderedEmail {
        subject: proposal.draft_email_subject.clone(),
        body,
    }
}
