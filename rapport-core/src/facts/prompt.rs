//! Extraction request rendering and response parsing for delegated mode.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::FactCategory;
use super::extractor::FactCandidate;

/// Instruction sent to the text-analysis collaborator. `{categories}` and
/// `{message}` are substituted by [`build_extraction_prompt`].
pub const EXTRACTION_PROMPT: &str = r#"Extract durable facts the user states about themselves from the message below.
Only include information the user asserts directly; ignore questions, hypotheticals and facts about other speakers.

Allowed categories: {categories}

Respond with a JSON array. Each element must have:
  "category": one of the allowed categories,
  "key": a short snake_case identifier, stable across messages (e.g. "name", "likes_jazz"),
  "value": the fact in plain words,
  "confidence": a number between 0 and 1,
  "tags": an optional list of short labels.
Respond with [] when the message contains no facts.

Message:
"""
{message}
""""#;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(?P<body>.*?)```").expect("fence pattern compiles")
});

/// Substitute `{name}` placeholders in `template`. Unknown placeholders are
/// left untouched.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Render the extraction request for `message`.
#[must_use]
pub fn build_extraction_prompt(message: &str) -> String {
    let categories = FactCategory::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    render_template(
        EXTRACTION_PROMPT,
        &[("categories", &categories), ("message", message.trim())],
    )
}

/// Parse a collaborator response into fact candidates.
///
/// Accepts a bare JSON array or an object with a `facts` array, either raw or
/// inside a fenced code block. Elements missing required keys are skipped.
/// Anything unparseable yields an empty list.
#[must_use]
pub fn parse_candidates(response: &str) -> Vec<FactCandidate> {
    let Some(value) = locate_json(response) else {
        if !response.trim().is_empty() {
            warn!(len = response.len(), "Analyzer response contained no parseable JSON");
        }
        return Vec::new();
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("facts") {
            Some(Value::Array(items)) => items,
            _ => {
                warn!("Analyzer response object has no `facts` array");
                return Vec::new();
            }
        },
        _ => return Vec::new(),
    };

    let total = items.len();
    let candidates: Vec<FactCandidate> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if candidates.len() < total {
        warn!(
            skipped = total - candidates.len(),
            "Dropped malformed fact candidates"
        );
    }
    candidates
}

fn locate_json(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let fenced = FENCED_BLOCK
        .captures_iter(response)
        .filter_map(|caps| caps.name("body"))
        .find_map(|body| serde_json::from_str::<Value>(body.as_str().trim()).ok());
    if fenced.is_some() {
        return fenced;
    }
    // Prose around a bare payload.
    [('[', ']'), ('{', '}')].into_iter().find_map(|(open, close)| {
        let start = trimmed.find(open)?;
        let end = trimmed.rfind(close)?;
        (start < end)
            .then(|| serde_json::from_str::<Value>(&trimmed[start..=end]).ok())
            .flatten()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_categories_and_message() {
        let prompt = build_extraction_prompt("  My name is Ada.  ");
        assert!(prompt.contains("personal_info, preference"));
        assert!(prompt.contains("\"\"\"\nMy name is Ada.\n\"\"\""));
        assert!(!prompt.contains("{message}"));
    }

    #[test]
    fn render_template_leaves_unknown_placeholders() {
        assert_eq!(render_template("{a} {b}", &[("a", "x")]), "x {b}");
    }

    #[test]
    fn parses_raw_array() {
        let out = parse_candidates(
            r#"[{"category":"personal_info","key":"name","value":"Ada","confidence":0.9}]"#,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "name");
    }

    #[test]
    fn parses_fenced_object() {
        let response = "Here you go:\n```json\n{\"facts\": [{\"category\":\"work\",\"key\":\"job\",\"value\":\"pilot\",\"confidence\":0.8,\"tags\":[\"career\"]}]}\n```\nDone.";
        let out = parse_candidates(response);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tags, vec!["career"]);
    }

    #[test]
    fn parses_unlabelled_fence_and_embedded_prose() {
        let fenced = "```\n[{\"category\":\"hobby\",\"key\":\"hobby\",\"value\":\"chess\",\"confidence\":0.9}]\n```";
        assert_eq!(parse_candidates(fenced).len(), 1);
        let prose = "Sure! [{\"category\":\"hobby\",\"key\":\"hobby\",\"value\":\"chess\",\"confidence\":0.9}] hope that helps";
        assert_eq!(parse_candidates(prose).len(), 1);
    }

    #[test]
    fn skips_elements_missing_required_keys() {
        let out = parse_candidates(
            r#"[{"category":"work","value":"pilot"},{"category":"work","key":"job","value":"pilot","confidence":0.8}]"#,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_candidates("I could not find any facts, sorry.").is_empty());
        assert!(parse_candidates("").is_empty());
        assert!(parse_candidates("{\"answer\": 42}").is_empty());
        assert!(parse_candidates("42").is_empty());
    }
}
