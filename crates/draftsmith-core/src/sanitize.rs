//! Extraction of a JSON document from noisy model output.
//!
//! Models wrap their answer in reasoning blocks, markdown fences and chatty
//! preambles. [`extract_document`] peels those layers off and parses the
//! outermost brace-delimited object.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::contract::Document;

/// Errors from response sanitization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("no JSON object found in model response")]
    NoDocumentFound,
}

static THINK_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<think(?:ing)?>.*?</think(?:ing)?>").ok());

static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*\s*").ok());

/// Remove reasoning blocks and markdown fence markers from raw model text.
pub fn strip_noise(raw: &str) -> String {
    let mut cleaned = raw.to_string();
    if let Some(re) = THINK_BLOCK.as_ref() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    if let Some(re) = CODE_FENCE.as_ref() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Extract the JSON object a model produced.
///
/// The greedy span from the first `{` to the last `}` is tried first. If it
/// does not parse (for example two unrelated objects separated by prose), each
/// balanced top-level object is tried in order and the first one that parses
/// wins.
pub fn extract_document(raw: &str) -> Result<Document, SanitizeError> {
    let cleaned = strip_noise(raw);

    let (start, end) = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(SanitizeError::NoDocumentFound),
    };

    if let Some(doc) = parse_object(&cleaned[start..=end]) {
        return Ok(doc);
    }

    balanced_objects(&cleaned)
        .into_iter()
        .find_map(parse_object)
        .ok_or(SanitizeError::NoDocumentFound)
}

fn parse_object(span: &str) -> Option<Document> {
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Brace-balanced object spans in order of appearance, skipping braces inside
/// JSON strings. A candidate that never closes is abandoned and the scan
/// resumes at the next `{` after its start.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        match closing_brace(&text[start..]) {
            Some(len) => {
                spans.push(&text[start..start + len]);
                from = start + len;
            }
            None => from = start + 1,
        }
    }

    spans
}

/// Length of the object opening at the start of `text`, or `None` if it never
/// closes.
fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' if depth == 1 => return Some(index + ch.len_utf8()),
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patterns_compile() {
        assert!(THINK_BLOCK.is_some());
        assert!(CODE_FENCE.is_some());
    }

    #[test]
    fn test_clean_json() {
        let doc = extract_document(r#"{"key": "value"}"#).expect("parses");
        assert_eq!(doc["key"], "value");
    }

    #[test]
    fn test_markdown_fences() {
        let raw = "```json\n{\"key\": \"value\"}\n```";
        let doc = extract_document(raw).expect("parses");
        assert_eq!(doc["key"], "value");
    }

    #[test]
    fn test_bare_fences() {
        let raw = "```\n{\"key\": \"value\"}\n```\n";
        let doc = extract_document(raw).expect("parses");
        assert_eq!(doc["key"], "value");
    }

    #[test]
    fn test_leading_prose() {
        let raw = "Sure! Here is the JSON:\n\n{\"key\": \"value\"}";
        let doc = extract_document(raw).expect("parses");
        assert_eq!(doc["key"], "value");
    }

    #[test]
    fn test_think_block_stripped() {
        let raw = "<think>Let me reason about {this}...</think>\n{\"key\": \"value\"}";
        let doc = extract_document(raw).expect("parses");
        assert_eq!(doc["key"], "value");
    }

    #[test]
    fn test_multiline_think_block() {
        let raw = "<think>\nStep 1: think\nStep 2: more thinking\n</think>\n{\"answer\": 42}";
        let doc = extract_document(raw).expect("parses");
        assert_eq!(doc["answer"], 42);
    }

    #[test]
    fn test_two_think_blocks_removed_non_greedily() {
        let raw = "<think>a</think>{\"kept\": true}<think>b</think>";
        let doc = extract_document(raw).expect("parses");
        assert_eq!(doc["kept"], true);
    }

    #[test]
    fn test_no_json_fails() {
        let err = extract_document("This is just plain text with no JSON.").unwrap_err();
        assert_eq!(err, SanitizeError::NoDocumentFound);
    }

    #[test]
    fn test_syntax_error_fails() {
        let err = extract_document("{\"key\": }").unwrap_err();
        assert_eq!(err, SanitizeError::NoDocumentFound);
    }

    #[test]
    fn test_closing_brace_before_opening_fails() {
        assert!(extract_document("} nothing here {").is_err());
    }

    #[test]
    fn test_unrelated_fragments_fall_back_to_balanced_scan() {
        let raw = r#"Option A: {"key": "first"} or maybe {"key": "second"}"#;
        let doc = extract_document(raw).expect("balanced scan recovers");
        assert_eq!(doc["key"], "first");
    }

    #[test]
    fn test_balanced_scan_skips_braces_in_strings() {
        let raw = r#"noise {"text": "a } inside", "n": 1} tail {broken}"#;
        let doc = extract_document(raw).expect("parses");
        assert_eq!(doc["text"], "a } inside");
        assert_eq!(doc["n"], 1);
    }

    #[test]
    fn test_unclosed_brace_in_prose_is_skipped() {
        let raw = r#"Use the {placeholder syntax described below. Result: {"a": 1}"#;
        let doc = extract_document(raw).expect("scan restarts after unclosed candidate");
        assert_eq!(doc["a"], 1);
    }

    #[test]
    fn test_stray_quote_in_prose_is_skipped() {
        let raw = r#"Template {name"s} then {"a": 1}"#;
        let doc = extract_document(raw).expect("scan restarts after stray quote");
        assert_eq!(doc["a"], 1);
    }

    #[test]
    fn test_fences_inside_string_values_are_stripped() {
        let inner = json!({"draft_pr_body": "See:\n```rust\nfn x() {}\n```"});
        let raw = format!("```json\n{}\n```", inner);
        let doc = extract_document(&raw).expect("parses");
        assert_eq!(doc["draft_pr_body"], "See:\n\nfn x() {}\n");
    }

    #[test]
    fn test_nested_object_preserved() {
        let expected = json!({"outer": {"inner": [1, 2, {"deep": "x"}]}});
        let raw = format!("Here you go:\n```json\n{}\n```", expected);
        let doc = extract_document(&raw).expect("parses");
        assert_eq!(Value::Object(doc), expected);
    }
}
