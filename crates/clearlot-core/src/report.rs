//! Quality reporting: the caller-visible audit of an ingestion run.
//!
//! Every counter is a direct tally from an upstream stage; the report makes
//! no judgment calls of its own. It is the contract for "how much do I trust
//! this import" and must always satisfy `raw == validated + dropped`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extract::ExtractDiagnostics;
use crate::{AggregatedHolding, DropReason, HoldingRow};

/// Machine-checkable summary of one ingestion run. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub raw: usize,
    pub validated: usize,
    pub aggregated: usize,
    pub dropped: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dropped_reasons: BTreeMap<String, usize>,
    /// Rows with at least one field derived during reconciliation.
    pub reconciled: usize,
    /// Rows whose numbers disagreed beyond tolerance.
    pub mismatch_detected: usize,
    pub parse_repair_applied: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_repair_actions: Vec<String>,
    pub unknown_name_count: usize,
    pub placeholder_symbol_count: usize,
    pub zero_qty_zero_price_nonzero_value_count: usize,
    pub account_header_row_count: usize,
    /// Validated rows beyond the first for their symbol.
    pub duplicate_symbol_lot_count: usize,
}

impl QualityReport {
    /// Assemble the report from the pipeline's intermediate collections.
    pub fn assemble(
        raw_count: usize,
        kept: &[HoldingRow],
        dropped: &[(HoldingRow, DropReason)],
        holdings: &[AggregatedHolding],
        diagnostics: Option<&ExtractDiagnostics>,
    ) -> Self {
        let mut dropped_reasons: BTreeMap<String, usize> = BTreeMap::new();
        for (_, reason) in dropped {
            *dropped_reasons.entry(reason.as_str().to_owned()).or_insert(0) += 1;
        }

        let count_reason = |histogram: &BTreeMap<String, usize>, reason: DropReason| {
            histogram.get(reason.as_str()).copied().unwrap_or_default()
        };

        let placeholder_symbol_count = count_reason(&dropped_reasons, DropReason::PlaceholderSymbol);
        let zero_qty_zero_price_nonzero_value_count =
            count_reason(&dropped_reasons, DropReason::ZeroQtyZeroPriceNonzeroValue);
        let account_header_row_count = count_reason(&dropped_reasons, DropReason::AccountHeaderRow);

        let unknown_name_count = kept
            .iter()
            .filter(|row| {
                row.name
                    .as_deref()
                    .is_none_or(|name| name.eq_ignore_ascii_case("unknown"))
            })
            .count();

        Self {
            raw: raw_count,
            validated: kept.len(),
            aggregated: holdings.len(),
            dropped: dropped.len(),
            reconciled: kept
                .iter()
                .filter(|row| row.reconciliation.any_reconciled())
                .count(),
            mismatch_detected: kept
                .iter()
                .filter(|row| row.reconciliation.mismatch_detected)
                .count(),
            parse_repair_applied: diagnostics.is_some_and(|d| d.repair_applied),
            parse_repair_actions: diagnostics
                .map(|d| d.repair_actions.clone())
                .unwrap_or_default(),
            unknown_name_count,
            placeholder_symbol_count,
            zero_qty_zero_price_nonzero_value_count,
            account_header_row_count,
            duplicate_symbol_lot_count: kept.len().saturating_sub(holdings.len()),
            dropped_reasons,
        }
    }

    /// Internal consistency check used by callers and tests.
    pub fn is_consistent(&self) -> bool {
        self.raw == self.validated + self.dropped
            && self.aggregated <= self.validated
            && self.dropped_reasons.values().sum::<usize>() == self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_is_consistent() {
        let report = QualityReport::assemble(0, &[], &[], &[], None);
        assert!(report.is_consistent());
        assert_eq!(report.raw, 0);
        assert!(!report.parse_repair_applied);
    }

    #[test]
    fn drop_histogram_matches_dropped_count() {
        let dropped = vec![
            (HoldingRow::default(), DropReason::NoSymbol),
            (HoldingRow::default(), DropReason::NoSymbol),
            (HoldingRow::default(), DropReason::AccountHeaderRow),
        ];

        let report = QualityReport::assemble(3, &[], &dropped, &[], None);

        assert!(report.is_consistent());
        assert_eq!(report.dropped, 3);
        assert_eq!(report.dropped_reasons.get("no_symbol"), Some(&2));
        assert_eq!(report.account_header_row_count, 1);
    }

    #[test]
    fn repair_diagnostics_flow_into_report() {
        let diagnostics = ExtractDiagnostics {
            repair_applied: true,
            repair_actions: vec![String::from("strip_code_fences")],
        };

        let report = QualityReport::assemble(0, &[], &[], &[], Some(&diagnostics));

        assert!(report.parse_repair_applied);
        assert_eq!(report.parse_repair_actions, vec!["strip_code_fences"]);
    }
}
