//! Row validation: keep/drop classification with auditable reasons.
//!
//! Data-quality problems are never errors here. Every row yields exactly one
//! verdict, and every dropped row carries the first matching reason in a
//! fixed priority order so the quality report stays deterministic.

use serde::{Deserialize, Serialize};

use crate::HoldingRow;

/// Reasons a normalized row is excluded from aggregation, in evaluation
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NoSymbol,
    AccountHeaderRow,
    PlaceholderSymbol,
    ZeroQtyZeroPriceNonzeroValue,
    MissingFinancialData,
}

impl DropReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSymbol => "no_symbol",
            Self::AccountHeaderRow => "account_header_row",
            Self::PlaceholderSymbol => "placeholder_symbol",
            Self::ZeroQtyZeroPriceNonzeroValue => "zero_qty_zero_price_nonzero_value",
            Self::MissingFinancialData => "missing_financial_data",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account-type keywords that mark a statement's account-title line.
const ACCOUNT_KEYWORDS: [&str; 10] = [
    "ira",
    "roth",
    "traditional",
    "individual",
    "tod",
    "rollover",
    "401(k)",
    "joint",
    "custodial",
    "brokerage account",
];

/// Classify one normalized row. `None` means keep; `Some(reason)` names the
/// first drop rule that matched. Pure and total.
pub fn validate_row(row: &HoldingRow) -> Option<DropReason> {
    let symbol = row.normalized_symbol();

    if symbol.is_none() {
        return Some(DropReason::NoSymbol);
    }

    let zero_qty = row.quantity.is_none_or(|v| v == 0.0);
    let zero_price = row.price.is_none_or(|v| v == 0.0);

    // Header lines never carry per-share data; requiring that keeps
    // mixed-case fund names ("... Traditional Index Fund") alive.
    if zero_qty && zero_price && row.name.as_deref().is_some_and(is_account_header) {
        return Some(DropReason::AccountHeaderRow);
    }

    if symbol.as_deref().is_some_and(is_placeholder_symbol) && zero_qty && zero_price {
        return Some(DropReason::PlaceholderSymbol);
    }

    if zero_qty && zero_price && row.market_value.is_some_and(|v| v > 0.0) {
        return Some(DropReason::ZeroQtyZeroPriceNonzeroValue);
    }

    if !row.has_any_financial_data() {
        return Some(DropReason::MissingFinancialData);
    }

    None
}

/// Placeholder symbols are generated by the regex-fallback adapter for rows
/// it could not identify: `HOLDING_<n>`.
pub fn is_placeholder_symbol(symbol: &str) -> bool {
    let upper = symbol.trim().to_ascii_uppercase();
    match upper.strip_prefix("HOLDING_") {
        Some(rest) => !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()),
        None => false,
    }
}

/// Account-title heuristic: the description names a person and an account
/// type ("John W. Doe - Traditional IRA") rather than a security.
fn is_account_header(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    let has_keyword = ACCOUNT_KEYWORDS
        .iter()
        .any(|keyword| contains_word(&lowered, keyword));

    has_keyword && person_name_token_count(name) >= 2
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        let boundary = |ch: Option<char>| ch.is_none_or(|c| !c.is_ascii_alphanumeric());
        boundary(before) && boundary(after)
    })
}

/// Count tokens shaped like parts of a person's name: capitalized mixed-case
/// words ("John", "Doe") or initials ("W."). All-caps security names
/// ("ISHARES CORE S&P 500") do not qualify.
fn person_name_token_count(name: &str) -> usize {
    name.split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|token| {
            let token = token.trim_end_matches('.');
            let mut chars = token.chars();
            match chars.next() {
                Some(first) if first.is_ascii_uppercase() => {
                    let rest: Vec<char> = chars.collect();
                    rest.is_empty() || rest.iter().all(|c| c.is_ascii_lowercase())
                }
                _ => false,
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: Option<&str>, name: Option<&str>) -> HoldingRow {
        HoldingRow {
            symbol: symbol.map(str::to_owned),
            name: name.map(str::to_owned),
            ..HoldingRow::default()
        }
    }

    #[test]
    fn missing_symbol_is_first_priority() {
        let verdict = validate_row(&row(None, Some("Apple Inc")));
        assert_eq!(verdict, Some(DropReason::NoSymbol));
    }

    #[test]
    fn account_header_beats_missing_financial_data() {
        let candidate = row(Some("ACCT"), Some("John W. Doe - Traditional IRA"));
        assert_eq!(validate_row(&candidate), Some(DropReason::AccountHeaderRow));
    }

    #[test]
    fn all_caps_security_names_are_not_account_headers() {
        let mut candidate = row(Some("ITOT"), Some("ISHARES CORE S&P TOTAL - INDIVIDUAL INVESTOR CLASS"));
        candidate.quantity = Some(12.0);
        candidate.price = Some(101.5);
        candidate.market_value = Some(1218.0);
        assert_eq!(validate_row(&candidate), None);
    }

    #[test]
    fn funds_with_account_keywords_survive_when_per_share_data_exists() {
        let mut candidate = row(Some("VTRIX"), Some("Vanguard Traditional Index Fund"));
        candidate.quantity = Some(40.0);
        candidate.price = Some(25.0);
        candidate.market_value = Some(1000.0);
        assert_eq!(validate_row(&candidate), None);
    }

    #[test]
    fn placeholder_symbol_without_corroboration_is_dropped() {
        let mut candidate = row(Some("HOLDING_3"), Some("Unknown"));
        candidate.market_value = Some(900_226.92);
        assert_eq!(validate_row(&candidate), Some(DropReason::PlaceholderSymbol));
    }

    #[test]
    fn placeholder_symbol_with_real_numbers_is_kept() {
        let mut candidate = row(Some("HOLDING_3"), Some("Unlabeled bond position"));
        candidate.quantity = Some(2.0);
        candidate.price = Some(100.0);
        candidate.market_value = Some(200.0);
        assert_eq!(validate_row(&candidate), None);
    }

    #[test]
    fn nonzero_value_with_no_quantity_or_price_is_dropped() {
        let mut candidate = row(Some("XYZ"), Some("Unknown"));
        candidate.market_value = Some(900_226.92);
        assert_eq!(
            validate_row(&candidate),
            Some(DropReason::ZeroQtyZeroPriceNonzeroValue)
        );
    }

    #[test]
    fn empty_financials_are_dropped_last() {
        let candidate = row(Some("ABC"), Some("Some Security"));
        assert_eq!(
            validate_row(&candidate),
            Some(DropReason::MissingFinancialData)
        );
    }

    #[test]
    fn ordinary_row_is_kept() {
        let mut candidate = row(Some("TSLA"), Some("Tesla Inc"));
        candidate.quantity = Some(5.0);
        candidate.price = Some(212.0);
        candidate.market_value = Some(1060.0);
        assert_eq!(validate_row(&candidate), None);
    }

    #[test]
    fn placeholder_pattern_requires_numeric_suffix() {
        assert!(is_placeholder_symbol("HOLDING_1"));
        assert!(is_placeholder_symbol("holding_42"));
        assert!(!is_placeholder_symbol("HOLDING_"));
        assert!(!is_placeholder_symbol("HOLDINGS"));
        assert!(!is_placeholder_symbol("HOLDING_X1"));
    }
}
