//! Output contract for model responses.
//!
//! A single field table ([`CONTRACT_FIELDS`]) drives the defaulting pass, the
//! validator and the exported JSON Schema, so the three cannot drift apart.
//! The schema is closed: exactly ten keys, all required, no extras.

use serde_json::{json, Map, Value};

use crate::domain::StructuredChangeProposal;

/// A parsed JSON object as produced by the sanitizer.
pub type Document = Map<String, Value>;

/// Shape constraint for one contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text with a minimum length in characters.
    Text { min_len: usize, default: &'static str },
    /// List of strings; `non_empty` requires at least one item.
    List { non_empty: bool },
}

/// One entry of the contract field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// The safe default substituted when the field is absent or null.
    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Text { default, .. } => Value::String(default.to_string()),
            FieldKind::List { .. } => Value::Array(Vec::new()),
        }
    }
}

const fn text(name: &'static str, min_len: usize, default: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text { min_len, default },
    }
}

const fn list(name: &'static str, non_empty: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::List { non_empty },
    }
}

/// The ten contract fields, in canonical order.
pub static CONTRACT_FIELDS: [FieldSpec; 10] = [
    text("problem_summary", 10, ""),
    list("implementation_plan", true),
    list("tasks", true),
    list("files_to_edit", true),
    list("tests_to_add_or_run", true),
    list("risk_notes", false),
    text("draft_pr_title", 5, "Draft: untitled"),
    text("draft_pr_body", 10, "No body provided."),
    text("draft_email_subject", 5, "[Draft PR] untitled"),
    text("draft_email_body", 10, "No email body provided."),
];

/// Look up a field by name.
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    CONTRACT_FIELDS.iter().find(|f| f.name == name)
}

/// Fill absent or null contract fields with their safe defaults.
///
/// Present non-null values are never touched, whatever their type, so the
/// validator still sees (and reports) a wrongly typed value. Idempotent.
pub fn fill_defaults(mut doc: Document) -> Document {
    for spec in &CONTRACT_FIELDS {
        let missing = doc.get(spec.name).map_or(true, Value::is_null);
        if missing {
            doc.insert(spec.name.to_string(), spec.default_value());
        }
    }
    doc
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Debug)]
struct Issue {
    path: Vec<PathSegment>,
    message: String,
}

impl Issue {
    fn root(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    fn at(field: &str, message: impl Into<String>) -> Self {
        Self {
            path: vec![PathSegment::Key(field.to_string())],
            message: message.into(),
        }
    }

    fn at_item(field: &str, index: usize, message: impl Into<String>) -> Self {
        Self {
            path: vec![PathSegment::Key(field.to_string()), PathSegment::Index(index)],
            message: message.into(),
        }
    }

    fn render(&self) -> String {
        let path = if self.path.is_empty() {
            "(root)".to_string()
        } else {
            self.path
                .iter()
                .map(|s| match s {
                    PathSegment::Key(k) => k.clone(),
                    PathSegment::Index(i) => i.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".")
        };
        format!("[{}] {}", path, self.message)
    }
}

/// Outcome of validating a document against the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractVerdict {
    /// Errors sorted by field path, formatted `"[field.path] message"`.
    pub errors: Vec<String>,
}

impl ContractVerdict {
    /// Whether the document satisfies the contract (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate a document against the closed ten-field contract.
pub fn validate(doc: &Value) -> ContractVerdict {
    let Some(obj) = doc.as_object() else {
        return ContractVerdict {
            errors: vec![Issue::root(format!(
                "document must be an object, found {}",
                type_name(doc)
            ))
            .render()],
        };
    };

    let mut issues = Vec::new();

    for key in obj.keys() {
        if field(key).is_none() {
            issues.push(Issue::root(format!(
                "additional property '{}' is not allowed",
                key
            )));
        }
    }

    for spec in &CONTRACT_FIELDS {
        match obj.get(spec.name) {
            None => issues.push(Issue::at(spec.name, "is a required property")),
            Some(value) => check_field(spec, value, &mut issues),
        }
    }

    issues.sort_by(|a, b| a.path.cmp(&b.path));

    ContractVerdict {
        errors: issues.iter().map(Issue::render).collect(),
    }
}

fn check_field(spec: &FieldSpec, value: &Value, issues: &mut Vec<Issue>) {
    match spec.kind {
        FieldKind::Text { min_len, .. } => match value.as_str() {
            None => issues.push(Issue::at(
                spec.name,
                format!("expected a string, found {}", type_name(value)),
            )),
            Some(s) => {
                let len = s.chars().count();
                if len < min_len {
                    issues.push(Issue::at(
                        spec.name,
                        format!("must be at least {} characters long (got {})", min_len, len),
                    ));
                }
            }
        },
        FieldKind::List { non_empty } => match value.as_array() {
            None => issues.push(Issue::at(
                spec.name,
                format!("expected an array of strings, found {}", type_name(value)),
            )),
            Some(items) => {
                if non_empty && items.is_empty() {
                    issues.push(Issue::at(spec.name, "must contain at least 1 item"));
                }
                for (index, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        issues.push(Issue::at_item(
                            spec.name,
                            index,
                            format!("expected a string, found {}", type_name(item)),
                        ));
                    }
                }
            }
        },
    }
}

/// Errors from turning a document into a typed proposal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("document violates the output contract: {}", .0.join("; "))]
    SchemaInvalid(Vec<String>),

    #[error("failed to decode proposal: {0}")]
    Decode(String),
}

/// Validate a defaulted document and decode it into a [`StructuredChangeProposal`].
pub fn into_proposal(doc: Document) -> Result<StructuredChangeProposal, ContractError> {
    let value = Value::Object(doc);
    let verdict = validate(&value);
    if !verdict.is_valid() {
        return Err(ContractError::SchemaInvalid(verdict.errors));
    }
    serde_json::from_value(value).map_err(|e| ContractError::Decode(e.to_string()))
}

/// JSON Schema (draft-07) for the contract, generated from [`CONTRACT_FIELDS`].
pub fn contract_schema() -> Value {
    let mut properties = Map::new();
    for spec in &CONTRACT_FIELDS {
        let schema = match spec.kind {
            FieldKind::Text { min_len, .. } => json!({
                "type": "string",
                "minLength": min_len,
            }),
            FieldKind::List { non_empty } => {
                let mut s = json!({
                    "type": "array",
                    "items": { "type": "string" },
                });
                if non_empty {
                    s["minItems"] = json!(1);
                }
                s
            }
        };
        properties.insert(spec.name.to_string(), schema);
    }

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "StructuredChangeProposal",
        "type": "object",
        "additionalProperties": false,
        "required": CONTRACT_FIELDS.iter().map(|f| f.name).collect::<Vec<_>>(),
        "properties": properties,
    })
}
