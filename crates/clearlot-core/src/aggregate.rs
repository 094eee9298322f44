//! Lot aggregation: fold validated rows sharing a symbol into one holding.
//!
//! Statements frequently split a position across partial lots and re-buys.
//! Grouping is by case-normalized symbol; sums are order-independent and no
//! tolerance checks re-run here (those were resolved per-lot upstream).

use std::collections::BTreeMap;

use crate::{AggregatedHolding, HoldingRow};

/// Aggregate validated rows into one holding per distinct symbol, sorted by
/// symbol for deterministic output.
pub fn aggregate_lots(rows: &[HoldingRow]) -> Vec<AggregatedHolding> {
    let mut groups: BTreeMap<String, Vec<&HoldingRow>> = BTreeMap::new();

    for row in rows {
        // Rows without a symbol were dropped by validation and never reach
        // this stage; skipping here keeps the function total anyway.
        if let Some(symbol) = row.normalized_symbol() {
            groups.entry(symbol).or_default().push(row);
        }
    }

    groups
        .into_iter()
        .map(|(symbol, lots)| fold_group(symbol, &lots))
        .collect()
}

fn fold_group(symbol: String, lots: &[&HoldingRow]) -> AggregatedHolding {
    let quantity = sum_present(lots, |lot| lot.quantity);
    let market_value = sum_present(lots, |lot| lot.market_value);
    let cost_basis = sum_present(lots, |lot| lot.cost_basis);
    let unrealized_gain_loss = sum_present(lots, |lot| lot.unrealized_gain_loss);
    let est_annual_income = sum_present(lots, |lot| lot.est_annual_income);

    let price = match (quantity, market_value) {
        (Some(qty), Some(mv)) if qty != 0.0 => Some(mv / qty),
        _ if lots.len() == 1 => lots[0].price,
        _ => None,
    };

    let unrealized_gain_loss_pct = match (unrealized_gain_loss, cost_basis) {
        (Some(gl), Some(cost)) if cost != 0.0 => Some(gl / cost * 100.0),
        _ if lots.len() == 1 => lots[0].unrealized_gain_loss_pct,
        _ => None,
    };

    let est_yield = match (est_annual_income, market_value) {
        (Some(income), Some(mv)) if mv != 0.0 => Some(income / mv * 100.0),
        _ if lots.len() == 1 => lots[0].est_yield,
        _ => None,
    };

    AggregatedHolding {
        symbol,
        name: first_present(lots, |lot| lot.name.clone()),
        quantity,
        price,
        market_value,
        cost_basis,
        unrealized_gain_loss,
        unrealized_gain_loss_pct,
        sector: first_present(lots, |lot| lot.sector.clone()),
        asset_type: first_present(lots, |lot| lot.asset_type.clone()),
        est_annual_income,
        est_yield,
        lots_count: lots.len(),
        reconciled: lots.iter().any(|lot| lot.reconciliation.any_reconciled()),
        mismatch_detected: lots.iter().any(|lot| lot.reconciliation.mismatch_detected),
    }
}

/// Sum the present values of a field; `None` only when no lot carries one.
fn sum_present<F>(lots: &[&HoldingRow], field: F) -> Option<f64>
where
    F: Fn(&HoldingRow) -> Option<f64>,
{
    let mut total = None;
    for lot in lots {
        if let Some(value) = field(lot) {
            total = Some(total.unwrap_or(0.0) + value);
        }
    }
    total
}

fn first_present<T, F>(lots: &[&HoldingRow], field: F) -> Option<T>
where
    F: Fn(&HoldingRow) -> Option<T>,
{
    lots.iter().find_map(|lot| field(lot))
}
