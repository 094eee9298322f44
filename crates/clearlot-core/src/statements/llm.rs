//! LLM-JSON statement adapter.
//!
//! The extraction layer hands over raw model output; the resilient extractor
//! parses it and this adapter lifts the `holdings` array into raw rows.
//! Repair diagnostics are returned alongside so they reach the quality
//! report.

use serde_json::Value;

use super::StatementError;
use crate::extract::{extract_object, ExtractDiagnostics};
use crate::RawRow;

const HOLDINGS_KEY: &str = "holdings";

/// Parse LLM output text into raw rows plus repair diagnostics.
pub fn rows_from_llm_text(
    text: &str,
) -> Result<(Vec<RawRow>, ExtractDiagnostics), StatementError> {
    let (object, diagnostics) = extract_object(text, &[HOLDINGS_KEY])?;

    let Some(Value::Array(entries)) = object.get(HOLDINGS_KEY) else {
        return Err(StatementError::MalformedHoldings {
            key: HOLDINGS_KEY.to_owned(),
        });
    };

    let rows = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => Some(map.clone()),
            _ => None,
        })
        .collect();

    Ok((rows, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifts_holdings_array_into_rows() {
        let text = r#"{"holdings": [{"symbol": "AAPL", "quantity": 10}, {"symbol": "MSFT"}]}"#;

        let (rows, diagnostics) = rows_from_llm_text(text).expect("must parse");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("symbol").and_then(|v| v.as_str()), Some("AAPL"));
        assert!(!diagnostics.repair_applied);
    }

    #[test]
    fn fenced_output_is_repaired_and_diagnosed() {
        let text = "```json\n{\"holdings\": [{\"symbol\": \"VTI\"},]}\n```";

        let (rows, diagnostics) = rows_from_llm_text(text).expect("must repair");

        assert_eq!(rows.len(), 1);
        assert!(diagnostics.repair_applied);
    }

    #[test]
    fn non_array_holdings_is_a_typed_error() {
        let text = r#"{"holdings": "none"}"#;

        let err = rows_from_llm_text(text).expect_err("must fail");
        assert!(matches!(err, StatementError::MalformedHoldings { .. }));
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let text = r#"{"holdings": [{"symbol": "AAPL"}, "stray", 7]}"#;

        let (rows, _) = rows_from_llm_text(text).expect("must parse");
        assert_eq!(rows.len(), 1);
    }
}
