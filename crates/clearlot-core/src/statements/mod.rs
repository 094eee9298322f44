//! Document adapters: each turns one statement format into raw rows for the
//! normalizer.
//!
//! Adapters are independent of each other and deliberately dumb: they carry
//! values through as raw scalars and leave all coercion, aliasing, and
//! validation to the pipeline stages behind them.

mod csv;
mod llm;
mod pdf;

use thiserror::Error;

pub use csv::rows_from_csv;
pub use llm::rows_from_llm_text;
pub use pdf::{rows_from_pdf_table, rows_from_pdf_text, PdfStatement};

use crate::extract::ExtractError;

/// Failures while turning a statement document into raw rows.
///
/// These are document-level problems (unreadable CSV, missing LLM payload),
/// not row-level quality issues; those flow through the quality report.
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("csv statement could not be read: {0}")]
    Csv(#[from] ::csv::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("llm payload key '{key}' is not an array of objects")]
    MalformedHoldings { key: String },
}
