//! Numeric reconciliation of quantity, price, and market value.
//!
//! Market value is the figure brokers compute most reliably, while price and
//! quantity coming out of noisy PDF or LLM extraction are the weakest link.
//! When the three disagree beyond tolerance, price is re-derived from market
//! value and the disagreement is surfaced on the row rather than hidden.

use crate::{HoldingRow, ReconciliationOutcome};

/// Relative tolerance before a price/value disagreement counts as a mismatch.
pub const REL_TOLERANCE: f64 = 0.10;

/// Reconcile one row in place, filling derived numeric fields and recording
/// the outcome on `row.reconciliation`. Absent inputs skip the corresponding
/// rule; this never fails.
pub fn reconcile_row(row: &mut HoldingRow) {
    let (quantity, price, market_value, outcome) =
        reconcile_numbers(row.quantity, row.price, row.market_value);

    row.quantity = quantity;
    row.price = price;
    row.market_value = market_value;
    row.reconciliation = outcome;
}

/// Pure reconciliation over the three optional numbers.
///
/// Rules, applied in order:
/// 1. Missing market value is derived as `quantity * price`.
/// 2. With quantity and market value present, a missing price is derived as
///    `market_value / quantity`; a present price more than 10% away from the
///    derived one is overwritten by it (market value is authoritative) and
///    flagged.
/// 3. A final audit pass flags `expected = quantity * price` disagreeing with
///    market value by more than 10%. Flag only; values are not changed again.
pub fn reconcile_numbers(
    quantity: Option<f64>,
    price: Option<f64>,
    market_value: Option<f64>,
) -> (Option<f64>, Option<f64>, Option<f64>, ReconciliationOutcome) {
    let mut price = price;
    let mut market_value = market_value;
    let mut outcome = ReconciliationOutcome::default();

    // Rule 1: fill market value from quantity * price.
    if market_value.is_none() {
        if let (Some(qty), Some(px)) = (quantity, price) {
            if qty != 0.0 {
                market_value = Some(qty * px);
                outcome.record_reconciled("market_value");
            }
        }
    }

    // Rule 2: derive or correct price from market value.
    if let (Some(qty), Some(mv)) = (quantity, market_value) {
        if qty != 0.0 {
            let derived_price = mv / qty;
            match price {
                None => {
                    price = Some(derived_price);
                    outcome.record_reconciled("price");
                }
                Some(px) if derived_price != 0.0 => {
                    let rel_delta = (px - derived_price).abs() / derived_price.abs();
                    if rel_delta > REL_TOLERANCE {
                        outcome.mismatch_detected = true;
                        price = Some(derived_price);
                        outcome.record_reconciled("price");
                    }
                }
                Some(_) => {}
            }
        }
    }

    // Rule 3: audit check. The price here may already be the corrected one
    // from rule 2; the flag-only behavior is intentional and preserved.
    if let (Some(qty), Some(px), Some(mv)) = (quantity, price, market_value) {
        if mv != 0.0 {
            let expected = qty * px;
            if (expected - mv).abs() / mv.abs() > REL_TOLERANCE {
                outcome.mismatch_detected = true;
            }
        }
    }

    (quantity, price, market_value, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_missing_price_from_market_value() {
        let (_, price, market_value, outcome) =
            reconcile_numbers(Some(10.0), None, Some(1500.0));

        assert_eq!(price, Some(150.0));
        assert_eq!(market_value, Some(1500.0));
        assert!(outcome.reconciled_fields.contains("price"));
        assert!(!outcome.mismatch_detected);
    }

    #[test]
    fn derives_missing_market_value_from_quantity_and_price() {
        let (_, _, market_value, outcome) = reconcile_numbers(Some(4.0), Some(25.0), None);

        assert_eq!(market_value, Some(100.0));
        assert!(outcome.reconciled_fields.contains("market_value"));
        assert!(!outcome.mismatch_detected);
    }

    #[test]
    fn overwrites_price_when_disagreement_exceeds_tolerance() {
        // Implied price 150 is 50% away from the extracted 100.
        let (_, price, _, outcome) = reconcile_numbers(Some(10.0), Some(100.0), Some(1500.0));

        assert_eq!(price, Some(150.0));
        assert!(outcome.mismatch_detected);
        assert!(outcome.reconciled_fields.contains("price"));
    }

    #[test]
    fn keeps_price_within_tolerance() {
        // Implied price 150 vs extracted 145 is within 10%.
        let (_, price, _, outcome) = reconcile_numbers(Some(10.0), Some(145.0), Some(1500.0));

        assert_eq!(price, Some(145.0));
        assert!(!outcome.mismatch_detected);
        assert!(outcome.reconciled_fields.is_empty());
    }

    #[test]
    fn absent_inputs_skip_all_rules() {
        let (quantity, price, market_value, outcome) = reconcile_numbers(None, None, None);

        assert_eq!(quantity, None);
        assert_eq!(price, None);
        assert_eq!(market_value, None);
        assert_eq!(outcome, ReconciliationOutcome::default());
    }

    #[test]
    fn zero_quantity_never_divides() {
        let (_, price, _, outcome) = reconcile_numbers(Some(0.0), None, Some(900.0));

        assert_eq!(price, None);
        assert!(!outcome.any_reconciled());
    }

    #[test]
    fn reconcile_row_attaches_outcome() {
        let mut row = HoldingRow {
            symbol: Some(String::from("AAPL")),
            quantity: Some(10.0),
            market_value: Some(1500.0),
            ..HoldingRow::default()
        };

        reconcile_row(&mut row);

        assert_eq!(row.price, Some(150.0));
        assert!(row.reconciliation.reconciled_fields.contains("price"));
    }
}
