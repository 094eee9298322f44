//! Realtime provider adapters.
//!
//! Each adapter wraps one vendor API behind
//! [`MarketDataSource`](crate::data_source::MarketDataSource) and owns its
//! own circuit breaker. Adapters default to a mock transport with
//! deterministic payloads so chains are testable offline.

mod finnhub;
mod fmp;
mod yahoo;

pub use finnhub::FinnhubAdapter;
pub use fmp::FmpAdapter;
pub use yahoo::YahooAdapter;
