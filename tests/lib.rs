// Test library for cross-stage pipeline and provider-chain tests
pub use clearlot_core::{
    adapters::{FinnhubAdapter, FmpAdapter, YahooAdapter},
    chain::{ProviderChain, ProviderChainBuilder, ProviderFailure},
    data_source::{
        CapabilitySet, DataKind, FetchError, HealthState, HealthStatus, MarketDataSource,
        NewsFetch, PeersFetch, QuoteFetch,
    },
    ingest_rows, ingest_rows_with_diagnostics, rows_from_csv, rows_from_llm_text,
    rows_from_pdf_text, ProviderId, RawRow, Ticker,
};
pub use std::sync::Arc;
