//! # Clearlot Core
//!
//! Statement ingestion pipeline and realtime market-data fallback chain.
//!
//! ## Overview
//!
//! Clearlot turns heterogeneous brokerage-statement extracts (CSV rows, PDF
//! table/regex extraction, LLM-extracted JSON) into one canonical,
//! internally-consistent set of portfolio holdings plus a machine-checkable
//! quality report. A companion provider chain supplies live market context
//! (quotes, news, peers) with deterministic fallback.
//!
//! - **Document adapters** produce raw rows per statement format
//! - **Normalizer** maps field-name variants onto one canonical schema
//! - **Reconciler** enforces quantity/price/market-value consistency
//! - **Validator** classifies rows keep/drop with auditable reasons
//! - **Aggregator** folds lots per symbol
//! - **Quality report** tallies every decision for the caller
//! - **Provider chain** tries vendors in priority order and fails closed
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Realtime provider adapters (Finnhub, FMP, Yahoo) |
//! | [`cache`] | Caller-owned quote cache |
//! | [`chain`] | Provider fallback chain |
//! | [`circuit_breaker`] | Circuit breaker for upstream calls |
//! | [`coerce`] | Currency/percentage string coercion |
//! | [`data_source`] | Provider trait and request types |
//! | [`domain`] | Domain models (rows, holdings, quotes, tickers) |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`extract`] | Resilient JSON extraction for LLM output |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Row normalization |
//! | [`pipeline`] | Ingestion pipeline orchestration |
//! | [`reconcile`] | Numeric reconciliation |
//! | [`report`] | Quality reporting |
//! | [`source`] | Provider identifiers |
//! | [`statements`] | Document adapters (CSV, PDF, LLM) |
//! | [`validate`] | Row validation |
//!
//! ## Quick Start
//!
//! ```rust
//! use clearlot_core::{ingest_rows, rows_from_csv};
//!
//! let text = "symbol,quantity,market_value\nTSLA,2,400.00\nTSLA,3,660.00\n";
//! let rows = rows_from_csv(text).expect("csv parses");
//! let outcome = ingest_rows(&rows);
//!
//! assert_eq!(outcome.holdings.len(), 1);
//! assert_eq!(outcome.report.raw, 2);
//! assert!(outcome.report.is_consistent());
//! ```
//!
//! ## Error Handling
//!
//! Row-level data-quality issues are never errors: they become drop reasons
//! and mismatch flags in the quality report, and the pipeline always
//! completes. Typed errors are reserved for unrecoverable JSON extraction
//! failures ([`ExtractError`]) and provider-chain exhaustion
//! ([`ProviderFailure`]), which is fail-closed by design.

pub mod adapters;
pub mod aggregate;
pub mod cache;
pub mod chain;
pub mod circuit_breaker;
pub mod coerce;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod source;
pub mod statements;
pub mod validate;

// Re-export commonly used types at crate root for convenience

// Realtime adapters
pub use adapters::{FinnhubAdapter, FmpAdapter, YahooAdapter};

// Lot aggregation
pub use aggregate::aggregate_lots;

// Quote cache
pub use cache::{CacheMode, QuoteCache};

// Provider chain
pub use chain::{
    ChainAttempt, ProviderChain, ProviderChainBuilder, ProviderFailure, ProviderSnapshot,
};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Data source trait and types
pub use data_source::{
    CapabilitySet, DataKind, FetchError, FetchErrorKind, HealthState, HealthStatus,
    MarketDataSource, NewsFetch, PeersFetch, QuoteFetch,
};

// Domain models
pub use domain::{
    AggregatedHolding, HoldingRow, NewsArticle, PeerList, RawRow, RealtimeQuote,
    ReconciliationOutcome, SourceTag, Ticker, UtcDateTime,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

// Error types
pub use error::{CoreError, ValidationError};

// JSON extraction
pub use extract::{extract_object, ExtractDiagnostics, ExtractError};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient};

// Normalization and reconciliation
pub use normalize::normalize_row;
pub use reconcile::{reconcile_numbers, reconcile_row, REL_TOLERANCE};

// Pipeline entry points
pub use pipeline::{ingest_rows, ingest_rows_with_diagnostics, IngestOutcome};

// Quality report
pub use report::QualityReport;

// Provider identifiers
pub use source::ProviderId;

// Statement adapters
pub use statements::{
    rows_from_csv, rows_from_llm_text, rows_from_pdf_table, rows_from_pdf_text, PdfStatement,
    StatementError,
};

// Row validation
pub use validate::{is_placeholder_symbol, validate_row, DropReason};
