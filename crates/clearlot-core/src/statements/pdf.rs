//! PDF statement adapter: structured table rows with a regex fallback.
//!
//! PDF extraction upstream yields either table cells (when the layout engine
//! finds a grid) or plain text. Table rows are preferred; the regex fallback
//! scans text lines for position-shaped rows and assigns generated
//! `HOLDING_<n>` placeholder symbols to money lines it cannot identify.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::RawRow;

/// A PDF statement as handed over by the extraction layer.
#[derive(Debug, Clone, Default)]
pub struct PdfStatement {
    /// Table cell grids, one per detected table.
    pub tables: Vec<Vec<Vec<String>>>,
    /// Full page text, used when no table produced rows.
    pub text: String,
}

impl PdfStatement {
    /// Produce raw rows, preferring table extraction over the regex
    /// fallback.
    pub fn rows(&self) -> Vec<RawRow> {
        let mut rows = Vec::new();
        for table in &self.tables {
            rows.extend(rows_from_pdf_table(table));
        }

        if rows.is_empty() {
            rows = rows_from_pdf_text(&self.text);
        }

        rows
    }
}

/// Default column order assumed when a table carries no recognizable header.
const DEFAULT_COLUMNS: [&str; 5] = ["symbol", "description", "quantity", "price", "market_value"];

/// Convert one extracted table into raw rows.
///
/// The first row is used as a header when it contains at least one known
/// column word; otherwise the default statement column order applies.
pub fn rows_from_pdf_table(table: &[Vec<String>]) -> Vec<RawRow> {
    let Some(first) = table.first() else {
        return Vec::new();
    };

    let (headers, body): (Vec<String>, &[Vec<String>]) = if looks_like_header(first) {
        (
            first.iter().map(|cell| fold_header(cell)).collect(),
            &table[1..],
        )
    } else {
        (
            DEFAULT_COLUMNS.iter().map(|s| (*s).to_owned()).collect(),
            table,
        )
    };

    body.iter()
        .filter_map(|cells| {
            let mut row = RawRow::new();
            for (index, cell) in cells.iter().enumerate() {
                let Some(header) = headers.get(index) else {
                    continue;
                };
                if header.is_empty() || cell.trim().is_empty() {
                    continue;
                }
                row.insert(header.clone(), Value::String(cell.trim().to_owned()));
            }
            (!row.is_empty()).then_some(row)
        })
        .collect()
}

/// Regex fallback over plain statement text.
///
/// Two shapes are recognized: a full position line
/// (`AAPL Apple Inc 10 150.00 1,500.00`) and a description-plus-amount line
/// that gets a generated placeholder symbol so the validator can judge it.
pub fn rows_from_pdf_text(text: &str) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut placeholder_index = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(captures) = position_line_re().captures(line) {
            let mut row = RawRow::new();
            row.insert(
                String::from("symbol"),
                Value::String(captures["symbol"].to_owned()),
            );
            row.insert(
                String::from("description"),
                Value::String(captures["name"].trim().to_owned()),
            );
            row.insert(
                String::from("quantity"),
                Value::String(captures["qty"].to_owned()),
            );
            row.insert(
                String::from("price"),
                Value::String(captures["price"].to_owned()),
            );
            row.insert(
                String::from("market_value"),
                Value::String(captures["value"].to_owned()),
            );
            rows.push(row);
            continue;
        }

        if let Some(captures) = amount_line_re().captures(line) {
            placeholder_index += 1;
            let mut row = RawRow::new();
            row.insert(
                String::from("symbol"),
                Value::String(format!("HOLDING_{placeholder_index}")),
            );
            row.insert(
                String::from("description"),
                Value::String(captures["name"].trim().to_owned()),
            );
            row.insert(
                String::from("market_value"),
                Value::String(captures["value"].to_owned()),
            );
            rows.push(row);
        }
    }

    rows
}

fn position_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<symbol>[A-Z][A-Z0-9.\-]{0,9})\s+(?P<name>\S.*?)\s+(?P<qty>[\d,]+(?:\.\d+)?)\s+\$?(?P<price>[\d,]+(?:\.\d+)?)\s+\$?(?P<value>[\d,]+(?:\.\d+)?)$",
        )
        .expect("position line regex is valid")
    })
}

fn amount_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>\S.*?)\s+\$(?P<value>[\d,]+(?:\.\d+)?)$")
            .expect("amount line regex is valid")
    })
}

fn looks_like_header(cells: &[String]) -> bool {
    const HEADER_WORDS: [&str; 8] = [
        "symbol",
        "cusip",
        "description",
        "quantity",
        "shares",
        "price",
        "value",
        "cost",
    ];

    cells.iter().any(|cell| {
        let folded = cell.to_ascii_lowercase();
        HEADER_WORDS.iter().any(|word| folded.contains(word))
    })
}

fn fold_header(cell: &str) -> String {
    cell.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_with_header_row_uses_it() {
        let table = vec![
            vec![
                String::from("Symbol"),
                String::from("Description"),
                String::from("Quantity"),
            ],
            vec![
                String::from("AAPL"),
                String::from("Apple Inc"),
                String::from("10"),
            ],
        ];

        let rows = rows_from_pdf_table(&table);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("symbol").and_then(|v| v.as_str()), Some("AAPL"));
        assert_eq!(rows[0].get("quantity").and_then(|v| v.as_str()), Some("10"));
    }

    #[test]
    fn headerless_table_falls_back_to_default_columns() {
        let table = vec![vec![
            String::from("TSLA"),
            String::from("Tesla Inc"),
            String::from("2"),
            String::from("200.00"),
            String::from("400.00"),
        ]];

        let rows = rows_from_pdf_table(&table);

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("market_value").and_then(|v| v.as_str()),
            Some("400.00")
        );
    }

    #[test]
    fn regex_fallback_parses_position_lines() {
        let text = "Account Holdings\nAAPL Apple Inc 10 150.00 1,500.00\n";

        let rows = rows_from_pdf_text(text);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("symbol").and_then(|v| v.as_str()), Some("AAPL"));
        assert_eq!(
            rows[0].get("price").and_then(|v| v.as_str()),
            Some("150.00")
        );
    }

    #[test]
    fn unidentified_money_lines_get_placeholder_symbols() {
        let text = "Misc fixed income position $900,226.92\n";

        let rows = rows_from_pdf_text(text);

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("symbol").and_then(|v| v.as_str()),
            Some("HOLDING_1")
        );
        assert_eq!(
            rows[0].get("market_value").and_then(|v| v.as_str()),
            Some("900,226.92")
        );
    }

    #[test]
    fn statement_prefers_tables_over_text() {
        let statement = PdfStatement {
            tables: vec![vec![vec![
                String::from("VTI"),
                String::from("Vanguard Total"),
                String::from("3"),
                String::from("250.00"),
                String::from("750.00"),
            ]]],
            text: String::from("Something worth $12.00"),
        };

        let rows = statement.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("symbol").and_then(|v| v.as_str()), Some("VTI"));
    }
}
