//! Resilient JSON extraction for LLM output.
//!
//! Strict parse first; on failure, exactly one deterministic repair pass and
//! one re-parse. The bound is deliberate: repair cost and surprise stay
//! fixed, and callers that need more must re-prompt upstream rather than
//! loop here.

use serde_json::{Map, Value};
use thiserror::Error;

/// Typed failure after the single repair attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("input did not contain a JSON object: {detail}")]
    Unparsable { detail: String },
    #[error("top-level JSON value is not an object")]
    NotAnObject,
    #[error("parsed object is empty")]
    EmptyObject,
    #[error("required key '{key}' is missing")]
    MissingKey { key: String },
}

/// Which repair actions fired during extraction. Propagates into
/// `QualityReport.parse_repair_*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractDiagnostics {
    pub repair_applied: bool,
    pub repair_actions: Vec<String>,
}

/// Parse one JSON object out of raw text, tolerating the usual LLM framing
/// defects, and verify `required_keys` are present.
pub fn extract_object(
    text: &str,
    required_keys: &[&str],
) -> Result<(Map<String, Value>, ExtractDiagnostics), ExtractError> {
    if text.trim().is_empty() {
        return Err(ExtractError::EmptyInput);
    }

    let mut diagnostics = ExtractDiagnostics::default();

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => {
            let repaired = repair_pass(text, &mut diagnostics);
            diagnostics.repair_applied = true;
            serde_json::from_str::<Value>(&repaired).map_err(|err| ExtractError::Unparsable {
                detail: err.to_string(),
            })?
        }
    };

    let object = match value {
        Value::Object(object) => object,
        _ => return Err(ExtractError::NotAnObject),
    };

    if object.is_empty() {
        return Err(ExtractError::EmptyObject);
    }

    for key in required_keys {
        if !object.contains_key(*key) {
            return Err(ExtractError::MissingKey {
                key: (*key).to_owned(),
            });
        }
    }

    Ok((object, diagnostics))
}

/// The single deterministic repair pass. Each action is recorded only when
/// it changed the text.
fn repair_pass(text: &str, diagnostics: &mut ExtractDiagnostics) -> String {
    let mut current = text.to_owned();

    let stripped = strip_code_fences(&current);
    record_if_changed(&mut current, stripped, "strip_code_fences", diagnostics);

    let normalized = normalize_quotes(&current);
    record_if_changed(&mut current, normalized, "normalize_quotes", diagnostics);

    let sliced = slice_to_object(&current);
    record_if_changed(&mut current, sliced, "slice_to_object", diagnostics);

    let detrailed = remove_trailing_commas(&current);
    record_if_changed(&mut current, detrailed, "remove_trailing_commas", diagnostics);

    current
}

fn record_if_changed(
    current: &mut String,
    candidate: String,
    action: &str,
    diagnostics: &mut ExtractDiagnostics,
) {
    if candidate != *current {
        diagnostics.repair_actions.push(action.to_owned());
        *current = candidate;
    }
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return text.to_owned();
    };

    // Opening fence may carry a language hint ("```json").
    let body = match after_open.split_once('\n') {
        Some((_, rest)) => rest,
        None => after_open,
    };

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_owned()
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{00a0}' => ' ',
            other => other,
        })
        .collect()
}

/// Slice to the outermost `{...}` span so prose before or after the object
/// does not break parsing.
fn slice_to_object(text: &str) -> String {
    let Some(start) = text.find('{') else {
        return text.to_owned();
    };
    let Some(end) = text.rfind('}') else {
        return text.to_owned();
    };

    if end <= start {
        return text.to_owned();
    }

    text[start..=end].to_owned()
}

/// Remove trailing commas before `}` or `]`, skipping string literals.
fn remove_trailing_commas(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = text.chars().collect();

    for (index, &ch) in chars.iter().enumerate() {
        if in_string {
            output.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                output.push(ch);
            }
            ',' => {
                let next_significant = chars[index + 1..]
                    .iter()
                    .find(|c| !c.is_whitespace())
                    .copied();
                if !matches!(next_significant, Some('}') | Some(']')) {
                    output.push(ch);
                }
            }
            other => output.push(other),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse_records_no_repair() {
        let (object, diagnostics) =
            extract_object(r#"{"holdings": []}"#, &["holdings"]).expect("must parse");

        assert!(object.contains_key("holdings"));
        assert!(!diagnostics.repair_applied);
        assert!(diagnostics.repair_actions.is_empty());
    }

    #[test]
    fn fenced_response_with_trailing_comma_parses_in_one_pass() {
        let text = "```json\n{\"holdings\": [{\"symbol\": \"AAPL\"},],}\n```";

        let (object, diagnostics) = extract_object(text, &["holdings"]).expect("must repair");

        assert!(object.contains_key("holdings"));
        assert!(diagnostics.repair_applied);
        assert!(diagnostics
            .repair_actions
            .contains(&String::from("strip_code_fences")));
        assert!(diagnostics
            .repair_actions
            .contains(&String::from("remove_trailing_commas")));
    }

    #[test]
    fn smart_quotes_are_normalized() {
        let text = "{\u{201c}holdings\u{201d}: []}";

        let (_, diagnostics) = extract_object(text, &["holdings"]).expect("must repair");

        assert!(diagnostics
            .repair_actions
            .contains(&String::from("normalize_quotes")));
    }

    #[test]
    fn surrounding_prose_is_sliced_away() {
        let text = "Here are the holdings you asked for:\n{\"holdings\": []}\nLet me know!";

        let (object, diagnostics) = extract_object(text, &["holdings"]).expect("must repair");

        assert!(object.contains_key("holdings"));
        assert!(diagnostics
            .repair_actions
            .contains(&String::from("slice_to_object")));
    }

    #[test]
    fn unrepairable_text_fails_after_single_pass() {
        let err = extract_object("not json at all", &[]).expect_err("must fail");
        assert!(matches!(err, ExtractError::Unparsable { .. }));
    }

    #[test]
    fn missing_required_key_is_typed() {
        let err = extract_object(r#"{"positions": []}"#, &["holdings"]).expect_err("must fail");
        assert_eq!(
            err,
            ExtractError::MissingKey {
                key: String::from("holdings")
            }
        );
    }

    #[test]
    fn empty_object_is_rejected() {
        let err = extract_object("{}", &[]).expect_err("must fail");
        assert_eq!(err, ExtractError::EmptyObject);
    }

    #[test]
    fn top_level_array_is_rejected() {
        let err = extract_object("[1, 2]", &[]).expect_err("must fail");
        assert_eq!(err, ExtractError::NotAnObject);
    }

    #[test]
    fn commas_inside_strings_survive_repair() {
        let text = "```json\n{\"name\": \"Doe, John\", \"holdings\": [],}\n```";

        let (object, _) = extract_object(text, &["holdings"]).expect("must repair");
        assert_eq!(
            object.get("name").and_then(|v| v.as_str()),
            Some("Doe, John")
        );
    }
}
