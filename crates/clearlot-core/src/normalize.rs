//! Row normalization: adapter-specific key variants onto the canonical
//! holding schema.
//!
//! Each document adapter names fields its own way (`symbol_cusip` vs
//! `symbol`, `shares` vs `quantity`). The normalizer resolves those aliases
//! once, at the boundary; downstream stages only ever see [`HoldingRow`].

use serde_json::Value;

use crate::coerce::{coerce_f64, coerce_string};
use crate::{HoldingRow, RawRow};

const SYMBOL_ALIASES: [&str; 4] = ["symbol", "symbol_cusip", "ticker", "cusip"];
const NAME_ALIASES: [&str; 4] = ["name", "description", "security_description", "security_name"];
const QUANTITY_ALIASES: [&str; 3] = ["quantity", "shares", "qty"];
const PRICE_ALIASES: [&str; 4] = ["price", "unit_price", "last_price", "share_price"];
const MARKET_VALUE_ALIASES: [&str; 4] = ["market_value", "value", "current_value", "mkt_value"];
const COST_BASIS_ALIASES: [&str; 3] = ["cost_basis", "cost", "total_cost"];
const GAIN_LOSS_ALIASES: [&str; 3] = ["unrealized_gain_loss", "gain_loss", "unrealized_gl"];
const GAIN_LOSS_PCT_ALIASES: [&str; 3] = [
    "unrealized_gain_loss_pct",
    "gain_loss_pct",
    "unrealized_gl_pct",
];
const SECTOR_ALIASES: [&str; 2] = ["sector", "industry"];
const ASSET_TYPE_ALIASES: [&str; 3] = ["asset_type", "security_type", "type"];
const ACQUISITION_DATE_ALIASES: [&str; 3] = ["acquisition_date", "date_acquired", "purchase_date"];
const ANNUAL_INCOME_ALIASES: [&str; 3] = ["est_annual_income", "annual_income", "estimated_annual_income"];
const YIELD_ALIASES: [&str; 3] = ["est_yield", "yield", "estimated_yield"];

/// Map one raw statement row onto the canonical schema.
///
/// Total: unknown keys are ignored, absent or unparsable values become
/// `None`. This function never fails.
pub fn normalize_row(raw: &RawRow, source_index: usize) -> HoldingRow {
    HoldingRow {
        symbol: first_string(raw, &SYMBOL_ALIASES),
        name: first_string(raw, &NAME_ALIASES),
        quantity: first_f64(raw, &QUANTITY_ALIASES),
        price: first_f64(raw, &PRICE_ALIASES),
        market_value: first_f64(raw, &MARKET_VALUE_ALIASES),
        cost_basis: first_f64(raw, &COST_BASIS_ALIASES),
        unrealized_gain_loss: first_f64(raw, &GAIN_LOSS_ALIASES),
        unrealized_gain_loss_pct: first_f64(raw, &GAIN_LOSS_PCT_ALIASES),
        sector: first_string(raw, &SECTOR_ALIASES),
        asset_type: first_string(raw, &ASSET_TYPE_ALIASES),
        acquisition_date: first_string(raw, &ACQUISITION_DATE_ALIASES),
        est_annual_income: first_f64(raw, &ANNUAL_INCOME_ALIASES),
        est_yield: first_f64(raw, &YIELD_ALIASES),
        source_index,
        reconciliation: Default::default(),
    }
}

fn lookup<'a>(raw: &'a RawRow, aliases: &[&str]) -> Option<&'a Value> {
    // Keys are matched case-insensitively; adapters lowercase their headers
    // but LLM output does not always comply.
    for alias in aliases {
        if let Some(value) = raw.get(*alias) {
            return Some(value);
        }
    }

    raw.iter()
        .find(|(key, _)| {
            let folded = key.trim().to_ascii_lowercase();
            aliases.contains(&folded.as_str())
        })
        .map(|(_, value)| value)
}

fn first_string(raw: &RawRow, aliases: &[&str]) -> Option<String> {
    lookup(raw, aliases).and_then(coerce_string)
}

fn first_f64(raw: &RawRow, aliases: &[&str]) -> Option<f64> {
    lookup(raw, aliases).and_then(coerce_f64)
}
