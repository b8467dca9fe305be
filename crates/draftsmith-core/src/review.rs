//! Heuristic review of a change proposal.
//!
//! Evaluates a [`StructuredChangeProposal`] against an ordered list of
//! [`ReviewRule`]s and produces a [`ReviewOutcome`]. Each rule is an
//! independent label + predicate pair; only blocking rules can fail the
//! review, advisory rules add warnings.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::StructuredChangeProposal;

pub const LABEL_TESTS: &str = "Tests added or specified";
pub const LABEL_NO_BREAKING: &str = "No breaking changes detected";
pub const LABEL_NO_MIGRATION: &str = "No DB migration required";
pub const LABEL_NO_SECRETS: &str = "No secrets or API keys leaked";
pub const LABEL_RISKS_REVIEWED: &str = "Risk notes reviewed";

const BREAKING_KEYWORDS: &[&str] = &[
    "BREAKING",
    "breaking change",
    "deprecated",
    "removed",
    "backward incompatible",
];

const MIGRATION_KEYWORDS: &[&str] = &[
    "ALTER TABLE",
    "DROP TABLE",
    "CREATE TABLE",
    "ADD COLUMN",
    "DROP COLUMN",
    "RENAME COLUMN",
    "alembic",
    "migrate",
    "migration",
];

const SECRET_PATTERNS: &[&str] = &[
    // key/secret/password/token assignment with a quoted value of 8+ chars
    r#"(?i)(api[_-]?key|secret|password|token)\s*[:=]\s*['"][^'"]{8,}"#,
    // AWS access key id
    r"(?i)AKIA[0-9A-Z]{16}",
    // OpenAI-style key
    r"sk-[A-Za-z0-9]{20,}",
    // GitHub personal access token
    r"ghp_[A-Za-z0-9]{36}",
];

static SECRET_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SECRET_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// The searchable view of a proposal handed to every rule.
#[derive(Debug)]
pub struct ReviewSubject<'a> {
    pub proposal: &'a StructuredChangeProposal,
    /// PR body, risk notes and file list joined by spaces.
    pub text: String,
    lowered: String,
}

impl<'a> ReviewSubject<'a> {
    pub fn new(proposal: &'a StructuredChangeProposal) -> Self {
        let text = format!(
            "{} {} {}",
            proposal.draft_pr_body,
            proposal.risk_notes.join(" "),
            proposal.files_to_edit.join(" ")
        );
        let lowered = text.to_lowercase();
        Self {
            proposal,
            text,
            lowered,
        }
    }

    /// Case-insensitive match against any of `keywords`.
    pub fn mentions_any(&self, keywords: &[&str]) -> bool {
        keywords
            .iter()
            .any(|kw| self.lowered.contains(&kw.to_lowercase()))
    }
}

/// Whether a failing rule blocks the review or only warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Advisory,
    Blocking,
}

type RuleCheck = Box<dyn Fn(&ReviewSubject<'_>) -> bool + Send + Sync>;

/// A single review rule: a checklist label plus a predicate.
///
/// The predicate returns `true` when the proposal satisfies the rule.
pub struct ReviewRule {
    pub label: String,
    pub severity: RuleSeverity,
    /// Warning or blocker text recorded when the predicate fails.
    pub message: String,
    check: RuleCheck,
}

impl ReviewRule {
    pub fn new(
        label: impl Into<String>,
        severity: RuleSeverity,
        message: impl Into<String>,
        check: impl Fn(&ReviewSubject<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            severity,
            message: message.into(),
            check: Box::new(check),
        }
    }

    pub fn advisory(
        label: impl Into<String>,
        message: impl Into<String>,
        check: impl Fn(&ReviewSubject<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(label, RuleSeverity::Advisory, message, check)
    }

    pub fn blocking(
        label: impl Into<String>,
        message: impl Into<String>,
        check: impl Fn(&ReviewSubject<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(label, RuleSeverity::Blocking, message, check)
    }

    pub fn holds(&self, subject: &ReviewSubject<'_>) -> bool {
        (self.check)(subject)
    }
}

impl fmt::Debug for ReviewRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewRule")
            .field("label", &self.label)
            .field("severity", &self.severity)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Whether `text` matches any of the built-in secret patterns.
pub fn contains_secret(text: &str) -> bool {
    SECRET_REGEXES.iter().any(|re| re.is_match(text))
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// One checklist line of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub label: String,
    pub passed: bool,
}

/// Result of a heuristic review.
///
/// # Invariants
///
/// `passed == blockers.is_empty()`. The checklist keeps rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub passed: bool,
    pub warnings: Vec<String>,
    pub blockers: Vec<String>,
    pub checklist: Vec<ChecklistEntry>,
}

impl ReviewOutcome {
    /// Checklist value for `label`, if that rule ran.
    pub fn check(&self, label: &str) -> Option<bool> {
        self.checklist
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.passed)
    }

    /// Plain-text summary used in the PR body and the JSON report.
    pub fn summary(&self) -> String {
        let status = if self.passed { "PASS" } else { "BLOCKED" };
        let mut lines = vec![format!("Review: {}", status)];

        for entry in &self.checklist {
            let mark = if entry.passed { '✓' } else { '✗' };
            lines.push(format!("  [{}] {}", mark, entry.label));
        }
        if !self.blockers.is_empty() {
            lines.push("Blockers:".to_string());
            for b in &self.blockers {
                lines.push(format!("  ⛔ {}", b));
            }
        }
        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for w in &self.warnings {
                lines.push(format!("  ⚠  {}", w));
            }
        }

        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Rule-based reviewer holding an ordered rule list.
#[derive(Debug)]
pub struct HeuristicReviewer {
    rules: Vec<ReviewRule>,
}

impl Default for HeuristicReviewer {
    fn default() -> Self {
        Self::standard()
    }
}

impl HeuristicReviewer {
    /// Reviewer with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The five standard checks: tests, breaking changes, migrations,
    /// secrets (blocking) and the risk-notes marker.
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(ReviewRule::advisory(
                LABEL_TESTS,
                "No tests specified; consider adding tests.",
                |s| !s.proposal.tests_to_add_or_run.is_empty(),
            ))
            .with_rule(ReviewRule::advisory(
                LABEL_NO_BREAKING,
                "Possible breaking change detected; review carefully.",
                |s| !s.mentions_any(BREAKING_KEYWORDS),
            ))
            .with_rule(ReviewRule::advisory(
                LABEL_NO_MIGRATION,
                "DB migration keywords found; ensure the migration is safe.",
                |s| !s.mentions_any(MIGRATION_KEYWORDS),
            ))
            .with_rule(ReviewRule::blocking(
                LABEL_NO_SECRETS,
                "Potential secret/API key detected in output!",
                |s| !contains_secret(&s.text),
            ))
            .with_rule(ReviewRule::advisory(
                LABEL_RISKS_REVIEWED,
                "Risk notes not reviewed.",
                |_| true,
            ))
    }

    /// Append a rule.
    pub fn with_rule(mut self, rule: ReviewRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ReviewRule] {
        &self.rules
    }

    /// Run every rule in order against `proposal`.
    pub fn review(&self, proposal: &StructuredChangeProposal) -> ReviewOutcome {
        let subject = ReviewSubject::new(proposal);
        let mut warnings = Vec::new();
        let mut blockers = Vec::new();
        let mut checklist = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let ok = rule.holds(&subject);
            checklist.push(ChecklistEntry {
                label: rule.label.clone(),
                passed: ok,
            });
            if !ok {
                match rule.severity {
                    RuleSeverity::Advisory => warnings.push(rule.message.clone()),
                    RuleSeverity::Blocking => blockers.push(rule.message.clone()),
                }
            }
        }

        ReviewOutcome {
            passed: blockers.is_empty(),
            warnings,
            blockers,
            checklist,
        }
    }
}
