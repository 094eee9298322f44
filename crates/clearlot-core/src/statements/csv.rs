//! CSV statement adapter.

use csv::ReaderBuilder;
use serde_json::Value;

use super::StatementError;
use crate::RawRow;

/// Parse CSV statement text into raw rows keyed by normalized headers.
///
/// Headers are lowercased with separators folded to underscores so that
/// "Market Value" and "Symbol/CUSIP" land on the aliases the normalizer
/// knows. Cell values stay strings; coercion happens downstream.
pub fn rows_from_csv(text: &str) -> Result<Vec<RawRow>, StatementError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut row = RawRow::new();
        for (index, field) in record.iter().enumerate() {
            let Some(header) = headers.get(index) else {
                // flexible(true) admits ragged records; cells beyond the
                // header row have no addressable name.
                continue;
            };
            if header.is_empty() {
                continue;
            }
            row.insert(header.clone(), Value::String(field.to_owned()));
        }

        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn normalize_header(header: &str) -> String {
    let mut normalized = String::with_capacity(header.len());
    let mut last_was_separator = false;

    for ch in header.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            normalized.push(ch.to_ascii_lowercase());
            last_was_separator = false;
        } else if !last_was_separator && !normalized.is_empty() {
            normalized.push('_');
            last_was_separator = true;
        }
    }

    normalized.trim_end_matches('_').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_rows() {
        let text = "Symbol/CUSIP,Description,Quantity,Market Value\n\
                    AAPL,Apple Inc,10,\"$1,500.00\"\n\
                    MSFT,Microsoft Corp,5,$2000.00\n";

        let rows = rows_from_csv(text).expect("must parse");

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("symbol_cusip").and_then(|v| v.as_str()),
            Some("AAPL")
        );
        assert_eq!(
            rows[0].get("market_value").and_then(|v| v.as_str()),
            Some("$1,500.00")
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "symbol,quantity\nAAPL,10\n,\nMSFT,5\n";

        let rows = rows_from_csv(text).expect("must parse");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn ragged_rows_survive() {
        let text = "symbol,quantity,price\nAAPL,10\nMSFT,5,100,extra\n";

        let rows = rows_from_csv(text).expect("must parse");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].get("price").is_none());
        assert_eq!(rows[1].get("price").and_then(|v| v.as_str()), Some("100"));
    }

    #[test]
    fn header_normalization_folds_separators() {
        assert_eq!(normalize_header("Market Value"), "market_value");
        assert_eq!(normalize_header("Symbol/CUSIP"), "symbol_cusip");
        assert_eq!(normalize_header("  Est. Annual Income "), "est_annual_income");
    }
}
