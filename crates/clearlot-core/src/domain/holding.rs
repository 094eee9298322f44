use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Untyped statement row as produced by a document adapter.
///
/// Keys and value shapes are entirely adapter-specific; nothing downstream of
/// the normalizer ever touches one of these.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Audit trail attached to a row whenever a numeric field was derived or
/// found inconsistent during reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub reconciled_fields: BTreeSet<String>,
    #[serde(default)]
    pub mismatch_detected: bool,
}

impl ReconciliationOutcome {
    pub fn record_reconciled(&mut self, field: &str) {
        self.reconciled_fields.insert(field.to_owned());
    }

    pub fn any_reconciled(&self) -> bool {
        !self.reconciled_fields.is_empty()
    }
}

/// Canonical holding row produced by the normalizer.
///
/// Every field is present on every row; absent or unparsable source values
/// become `None` rather than errors. Numeric fields are filled or corrected
/// exactly once, by the reconciler; the aggregator is the only later stage
/// allowed to fold rows together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub market_value: Option<f64>,
    pub cost_basis: Option<f64>,
    pub unrealized_gain_loss: Option<f64>,
    pub unrealized_gain_loss_pct: Option<f64>,
    pub sector: Option<String>,
    pub asset_type: Option<String>,
    pub acquisition_date: Option<String>,
    pub est_annual_income: Option<f64>,
    pub est_yield: Option<f64>,
    /// Zero-based position of the source row within its statement.
    pub source_index: usize,
    #[serde(default)]
    pub reconciliation: ReconciliationOutcome,
}

impl HoldingRow {
    /// Grouping key used by the lot aggregator.
    pub fn normalized_symbol(&self) -> Option<String> {
        self.symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_uppercase)
    }

    pub fn has_any_financial_data(&self) -> bool {
        self.quantity.is_some() || self.price.is_some() || self.market_value.is_some()
    }
}

/// One merged holding per distinct symbol, after lot aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedHolding {
    pub symbol: String,
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub market_value: Option<f64>,
    pub cost_basis: Option<f64>,
    pub unrealized_gain_loss: Option<f64>,
    pub unrealized_gain_loss_pct: Option<f64>,
    pub sector: Option<String>,
    pub asset_type: Option<String>,
    pub est_annual_income: Option<f64>,
    pub est_yield: Option<f64>,
    /// Number of statement rows folded into this holding. Always >= 1.
    pub lots_count: usize,
    /// True when any folded lot had a field derived during reconciliation.
    pub reconciled: bool,
    /// True when any folded lot tripped the reconciliation tolerance.
    pub mismatch_detected: bool,
}
