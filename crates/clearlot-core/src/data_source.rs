//! Market data source trait and request/response contracts.
//!
//! Every realtime provider implements [`MarketDataSource`]; the chain in
//! [`crate::chain`] owns priority order and fallback. Adapters never retry
//! internally: one attempt, one timeout, one structured error.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{NewsArticle, PeerList, ProviderId, RealtimeQuote, Ticker};

pub const MAX_NEWS_DAYS_BACK: u32 = 90;

/// Data kind used for capability checks and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Quote,
    News,
    Peers,
}

impl DataKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::News => "news",
            Self::Peers => "peers",
        }
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported data kinds for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub quote: bool,
    pub news: bool,
    pub peers: bool,
}

impl CapabilitySet {
    pub const fn new(quote: bool, news: bool, peers: bool) -> Self {
        Self { quote, news, peers }
    }

    pub const fn full() -> Self {
        Self::new(true, true, true)
    }

    pub const fn supports(self, kind: DataKind) -> bool {
        match kind {
            DataKind::Quote => self.quote,
            DataKind::News => self.news,
            DataKind::Peers => self.peers,
        }
    }

    pub fn supported_kinds(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(3);
        if self.quote {
            values.push("quote");
        }
        if self.news {
            values.push("news");
        }
        if self.peers {
            values.push("peers");
        }
        values
    }
}

/// Health state consulted by the chain before an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime provider health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
}

impl HealthStatus {
    pub const fn new(state: HealthState) -> Self {
        Self { state }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy)
    }
}

/// Classification of a single provider attempt failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    UnsupportedKind,
    Unavailable,
    RateLimited,
    InvalidPayload,
    InvalidRequest,
    Internal,
}

/// Structured per-provider failure consumed by the chain.
///
/// Invalid payloads (zeroed prices, empty peer lists) are failures here, not
/// data: the chain must move on rather than surface them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    retryable: bool,
}

impl FetchError {
    pub fn unsupported_kind(kind: DataKind) -> Self {
        Self {
            kind: FetchErrorKind::UnsupportedKind,
            message: format!("data kind '{kind}' is not supported by this source"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::InvalidPayload,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::UnsupportedKind => "source.unsupported_kind",
            FetchErrorKind::Unavailable => "source.unavailable",
            FetchErrorKind::RateLimited => "source.rate_limited",
            FetchErrorKind::InvalidPayload => "source.invalid_payload",
            FetchErrorKind::InvalidRequest => "source.invalid_request",
            FetchErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

/// Request payload for quote fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteFetch {
    pub ticker: Ticker,
}

impl QuoteFetch {
    pub fn new(ticker: Ticker) -> Self {
        Self { ticker }
    }
}

/// Request payload for news fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsFetch {
    pub ticker: Ticker,
    pub days_back: u32,
}

impl NewsFetch {
    pub fn new(ticker: Ticker, days_back: u32) -> Result<Self, FetchError> {
        if days_back == 0 || days_back > MAX_NEWS_DAYS_BACK {
            return Err(FetchError::invalid_request(format!(
                "news lookback must be between 1 and {MAX_NEWS_DAYS_BACK} days, got {days_back}"
            )));
        }
        Ok(Self { ticker, days_back })
    }
}

/// Request payload for peer-list fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeersFetch {
    pub ticker: Ticker,
}

impl PeersFetch {
    pub fn new(ticker: Ticker) -> Self {
        Self { ticker }
    }
}

type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'a>>;

/// Provider adapter contract.
///
/// Implementations must be `Send + Sync`; the chain shares them across
/// concurrent per-ticker calls.
pub trait MarketDataSource: Send + Sync {
    /// Unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Supported data kinds.
    fn capabilities(&self) -> CapabilitySet;

    /// Fetch and validate one quote. A quote with a non-positive price must
    /// come back as [`FetchError::invalid_payload`], never as data.
    fn quote<'a>(&'a self, req: QuoteFetch) -> FetchFuture<'a, RealtimeQuote>;

    /// Fetch recent news articles.
    fn news<'a>(&'a self, req: NewsFetch) -> FetchFuture<'a, Vec<NewsArticle>>;

    /// Fetch the peer ticker list.
    fn peers<'a>(&'a self, req: PeersFetch) -> FetchFuture<'a, PeerList>;

    /// Current health, consulted by the chain before each attempt.
    fn health(&self) -> HealthStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_reports_supported_kinds() {
        let capabilities = CapabilitySet::new(true, false, true);

        assert!(capabilities.supports(DataKind::Quote));
        assert!(!capabilities.supports(DataKind::News));
        assert_eq!(capabilities.supported_kinds(), vec!["quote", "peers"]);
    }

    #[test]
    fn news_fetch_bounds_days_back() {
        let ticker = Ticker::parse("AAPL").expect("valid ticker");

        assert!(NewsFetch::new(ticker.clone(), 7).is_ok());
        let err = NewsFetch::new(ticker, 0).expect_err("must fail");
        assert_eq!(err.kind(), FetchErrorKind::InvalidRequest);
    }

    #[test]
    fn fetch_error_codes_are_stable() {
        assert_eq!(FetchError::unavailable("x").code(), "source.unavailable");
        assert_eq!(
            FetchError::invalid_payload("x").code(),
            "source.invalid_payload"
        );
        assert!(FetchError::rate_limited("x").retryable());
        assert!(!FetchError::invalid_payload("x").retryable());
    }
}
