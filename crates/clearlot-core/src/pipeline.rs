//! The ingestion pipeline: normalize → reconcile → validate → aggregate →
//! report.
//!
//! Every stage is a pure function over its input collection; the pipeline is
//! single-threaded, side-effect-free, and always completes with a report,
//! even for an empty or fully-rejected input.

use tracing::debug;

use crate::aggregate::aggregate_lots;
use crate::extract::ExtractDiagnostics;
use crate::normalize::normalize_row;
use crate::reconcile::reconcile_row;
use crate::report::QualityReport;
use crate::validate::validate_row;
use crate::{AggregatedHolding, DropReason, HoldingRow, RawRow};

/// Holdings plus audit report for one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub holdings: Vec<AggregatedHolding>,
    pub report: QualityReport,
}

/// Run the full pipeline over raw adapter rows.
pub fn ingest_rows(rows: &[RawRow]) -> IngestOutcome {
    ingest_rows_with_diagnostics(rows, None)
}

/// Run the full pipeline, threading JSON-repair diagnostics from an upstream
/// LLM extraction into the quality report.
pub fn ingest_rows_with_diagnostics(
    rows: &[RawRow],
    diagnostics: Option<&ExtractDiagnostics>,
) -> IngestOutcome {
    let mut kept: Vec<HoldingRow> = Vec::with_capacity(rows.len());
    let mut dropped: Vec<(HoldingRow, DropReason)> = Vec::new();

    for (index, raw) in rows.iter().enumerate() {
        let mut row = normalize_row(raw, index);
        reconcile_row(&mut row);

        match validate_row(&row) {
            None => kept.push(row),
            Some(reason) => {
                debug!(
                    event = "row_dropped",
                    source_index = index,
                    reason = reason.as_str(),
                    "statement row rejected"
                );
                dropped.push((row, reason));
            }
        }
    }

    let holdings = aggregate_lots(&kept);
    let report = QualityReport::assemble(rows.len(), &kept, &dropped, &holdings, diagnostics);

    debug!(
        event = "ingest_complete",
        raw = report.raw,
        validated = report.validated,
        aggregated = report.aggregated,
        dropped = report.dropped,
        "ingestion pipeline finished"
    );

    IngestOutcome { holdings, report }
}
