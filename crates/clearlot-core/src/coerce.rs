//! Numeric coercion for statement extracts.
//!
//! Brokerage exports and LLM extraction emit numbers in every shape a
//! statement renders them: `"$1,234.56"`, `"(12.3%)"`, `"N/A"`, `"--"`, bare
//! floats, or JSON numbers. Every pipeline stage funnels through these two
//! functions so the rules live in exactly one place.

use serde_json::Value;

/// Sentinels that statements use for "no value".
const NULL_TOKENS: [&str; 8] = ["n/a", "na", "none", "null", "-", "--", "—", "nan"];

/// Coerce a raw scalar into a float, returning `None` for anything that does
/// not carry a usable number. Never panics, never errors.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => coerce_str_f64(text),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerce a currency/percentage-like string into a float.
///
/// Handles thousands separators, currency signs, percent suffixes, and
/// accounting-style parentheses for negatives.
pub fn coerce_str_f64(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_ascii_lowercase();
    if NULL_TOKENS.contains(&lowered.as_str()) {
        return None;
    }

    // "(12.3%)" and "(1,234.56)" are negative in statement rendering.
    let (body, negated) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let cleaned: String = body
        .chars()
        .filter(|ch| !matches!(ch, '$' | '€' | '£' | ',' | '%' | ' '))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let parsed: f64 = cleaned.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }

    Some(if negated { -parsed } else { parsed })
}

/// Coerce a raw scalar into a non-empty trimmed string.
pub fn coerce_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    if text.is_empty() {
        return None;
    }

    let lowered = text.to_ascii_lowercase();
    if NULL_TOKENS.contains(&lowered.as_str()) {
        return None;
    }

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_currency_strings() {
        assert_eq!(coerce_str_f64("$1,234.56"), Some(1234.56));
        assert_eq!(coerce_str_f64("1234.56"), Some(1234.56));
        assert_eq!(coerce_str_f64("  $99  "), Some(99.0));
    }

    #[test]
    fn parses_parenthesized_negatives() {
        assert_eq!(coerce_str_f64("(12.3%)"), Some(-12.3));
        assert_eq!(coerce_str_f64("($1,500.00)"), Some(-1500.0));
    }

    #[test]
    fn parses_percentages() {
        assert_eq!(coerce_str_f64("4.5%"), Some(4.5));
    }

    #[test]
    fn null_tokens_become_none() {
        for token in ["N/A", "n/a", "--", "-", "", "  ", "None", "null"] {
            assert_eq!(coerce_str_f64(token), None, "token: {token:?}");
        }
    }

    #[test]
    fn garbage_becomes_none() {
        assert_eq!(coerce_str_f64("twelve"), None);
        assert_eq!(coerce_str_f64("$"), None);
        assert_eq!(coerce_f64(&json!(true)), None);
        assert_eq!(coerce_f64(&json!([1, 2])), None);
    }

    #[test]
    fn json_numbers_pass_through() {
        assert_eq!(coerce_f64(&json!(42.5)), Some(42.5));
        assert_eq!(coerce_f64(&json!(-3)), Some(-3.0));
    }

    #[test]
    fn strings_coerce_to_trimmed_text() {
        assert_eq!(coerce_string(&json!("  AAPL ")), Some(String::from("AAPL")));
        assert_eq!(coerce_string(&json!("")), None);
        assert_eq!(coerce_string(&json!("N/A")), None);
        assert_eq!(coerce_string(&json!(7)), Some(String::from("7")));
    }
}
