//! Prompt assembly for the completion backends.

use crate::domain::IssueContext;

/// System turn sent with every request. Describes the ten-field document.
pub const SYSTEM_PROMPT: &str = r#"You are a senior software engineer integrated into a CI/CD pipeline.

You receive an issue (title + body) together with optional design artefacts
(spec, plan, tasks). Your job is to produce a single JSON object, with no
markdown, commentary or extra text, that strictly follows this schema:

{
  "problem_summary": "string: one paragraph describing the problem",
  "implementation_plan": ["string: ordered steps"],
  "tasks": ["string: granular checklist items"],
  "files_to_edit": ["string: file paths to create or modify"],
  "tests_to_add_or_run": ["string: test files or test commands"],
  "risk_notes": ["string: security / breaking-change / migration warnings"],
  "draft_pr_title": "string",
  "draft_pr_body": "string: Markdown with ## Context, ## Changes, ## Tests, ## Risks, ## Checklist",
  "draft_email_subject": "string: e.g. [Draft PR] <issue title>",
  "draft_email_body": "string: short summary + link placeholders {{issue_url}} {{pr_url}} {{ci_status}}"
}

Rules:
- Output ONLY the JSON object. No ```json fences. No preamble.
- Every field is required.
- Arrays must have at least 1 item (except risk_notes which can be empty).
- Use placeholder tokens {{issue_url}}, {{pr_url}}, {{ci_status}} in the email body.
"#;

const FINAL_INSTRUCTION: &str = "Produce the JSON object now. No extra text.";

/// Build the user turn: labelled sections for the issue and each non-empty
/// artefact, then the closing instruction.
pub fn build_user_prompt(issue: &IssueContext) -> String {
    let mut parts = vec![format!(
        "## Issue\n**Title:** {}\n\n{}",
        issue.title, issue.body
    )];

    for (heading, content) in [
        ("Spec", &issue.spec),
        ("Plan", &issue.plan),
        ("Tasks", &issue.tasks),
    ] {
        if let Some(text) = content.as_deref().filter(|t| !t.trim().is_empty()) {
            parts.push(format!("## {}\n{}", heading, text));
        }
    }

    parts.push(FINAL_INSTRUCTION.to_string());
    parts.join("\n\n")
}
