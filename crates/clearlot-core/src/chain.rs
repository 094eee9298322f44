//! Ordered, fail-closed provider fallback chain.
//!
//! For each data kind, providers are tried strictly in priority order; a
//! provider that errors, times out, returns an invalid payload, or reports
//! itself unhealthy is skipped with structured telemetry and the next is
//! tried. Exhausting the chain raises [`ProviderFailure`], never a
//! fabricated or partially-zeroed payload. The chain is the only retry
//! mechanism; individual providers get exactly one attempt per call.

use std::collections::HashSet;
use std::env;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::adapters::{FinnhubAdapter, FmpAdapter, YahooAdapter};
use crate::data_source::{
    DataKind, FetchError, HealthState, MarketDataSource, NewsFetch, PeersFetch, QuoteFetch,
};
use crate::http_client::ReqwestHttpClient;
use crate::{NewsArticle, PeerList, ProviderId, RealtimeQuote, Ticker};

/// Freshness window for quote payloads.
pub const QUOTE_TTL_SECONDS: u64 = 60;
/// Freshness window for news payloads.
pub const NEWS_TTL_SECONDS: u64 = 900;
/// Freshness window for peer lists.
pub const PEERS_TTL_SECONDS: u64 = 86_400;

/// One failed provider attempt, preserved in the chain failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainAttempt {
    pub source: ProviderId,
    pub detail: String,
    pub retryable: bool,
}

/// Fail-closed error raised when every provider for a data kind is
/// exhausted. Carries every attempt so callers can decide whether to retry
/// later or degrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub kind: DataKind,
    pub ticker: Ticker,
    /// Providers attempted, in order, as a display string.
    pub source: String,
    pub detail: String,
    pub retryable: bool,
    pub attempts: Vec<ChainAttempt>,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "all providers exhausted for {} '{}' ({}): {}",
            self.kind, self.ticker, self.source, self.detail
        )
    }
}

impl std::error::Error for ProviderFailure {}

impl ProviderFailure {
    fn from_attempts(kind: DataKind, ticker: Ticker, attempts: Vec<ChainAttempt>) -> Self {
        let source = if attempts.is_empty() {
            String::from("none")
        } else {
            attempts
                .iter()
                .map(|attempt| attempt.source.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };

        let detail = attempts
            .last()
            .map(|attempt| attempt.detail.clone())
            .unwrap_or_else(|| String::from("no provider candidates configured"));

        let retryable = attempts.iter().any(|attempt| attempt.retryable);

        Self {
            kind,
            ticker,
            source,
            detail,
            retryable,
            attempts,
        }
    }
}

/// Capability/health snapshot for one configured provider, used by the
/// `sources` CLI command.
#[derive(Debug, Clone)]
pub struct ProviderSnapshot {
    pub id: ProviderId,
    pub supported_kinds: Vec<&'static str>,
    pub health: HealthState,
}

impl ProviderSnapshot {
    pub fn status_label(&self) -> &'static str {
        match self.health {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

/// Ordered provider registry plus fallback engine.
pub struct ProviderChain {
    providers: Vec<Arc<dyn MarketDataSource>>,
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(FinnhubAdapter::default()),
            Arc::new(FmpAdapter::default()),
            Arc::new(YahooAdapter::default()),
        ])
    }
}

impl ProviderChain {
    /// Build a chain from an explicit ordered provider list. Order is
    /// priority order.
    pub fn new(providers: Vec<Arc<dyn MarketDataSource>>) -> Self {
        let mut seen = HashSet::new();
        let providers = providers
            .into_iter()
            .filter(|provider| seen.insert(provider.id()))
            .collect();
        Self { providers }
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|provider| provider.id()).collect()
    }

    pub fn snapshots(&self) -> Vec<ProviderSnapshot> {
        self.providers
            .iter()
            .map(|provider| ProviderSnapshot {
                id: provider.id(),
                supported_kinds: provider.capabilities().supported_kinds(),
                health: provider.health().state,
            })
            .collect()
    }

    /// Fetch one validated quote, falling through providers in order.
    pub async fn fetch_quote(&self, ticker: &Ticker) -> Result<RealtimeQuote, ProviderFailure> {
        let req = QuoteFetch::new(ticker.clone());
        self.run(DataKind::Quote, ticker, |provider| {
            let req = req.clone();
            async move { provider.quote(req).await }
        })
        .await
    }

    /// Fetch recent news, falling through providers in order.
    pub async fn fetch_news(
        &self,
        ticker: &Ticker,
        days_back: u32,
    ) -> Result<Vec<NewsArticle>, ProviderFailure> {
        let req = match NewsFetch::new(ticker.clone(), days_back) {
            Ok(req) => req,
            Err(error) => {
                return Err(ProviderFailure::from_attempts(
                    DataKind::News,
                    ticker.clone(),
                    vec![ChainAttempt {
                        source: self
                            .providers
                            .first()
                            .map(|p| p.id())
                            .unwrap_or(ProviderId::Yahoo),
                        detail: error.to_string(),
                        retryable: false,
                    }],
                ));
            }
        };

        self.run(DataKind::News, ticker, |provider| {
            let req = req.clone();
            async move { provider.news(req).await }
        })
        .await
    }

    /// Fetch the peer list, falling through providers in order.
    pub async fn fetch_peers(&self, ticker: &Ticker) -> Result<PeerList, ProviderFailure> {
        let req = PeersFetch::new(ticker.clone());
        self.run(DataKind::Peers, ticker, |provider| {
            let req = req.clone();
            async move { provider.peers(req).await }
        })
        .await
    }

    async fn run<T, F, Fut>(
        &self,
        kind: DataKind,
        ticker: &Ticker,
        mut invoke: F,
    ) -> Result<T, ProviderFailure>
    where
        F: FnMut(Arc<dyn MarketDataSource>) -> Fut,
        Fut: std::future::Future<Output = Result<T, FetchError>>,
    {
        let started = Instant::now();
        let mut attempts: Vec<ChainAttempt> = Vec::new();

        for provider in &self.providers {
            let source = provider.id();

            if !provider.capabilities().supports(kind) {
                continue;
            }

            if provider.health().state == HealthState::Unhealthy {
                warn!(
                    event = "provider_skipped",
                    source = source.as_str(),
                    kind = kind.as_str(),
                    detail = "health check reported unhealthy",
                );
                attempts.push(ChainAttempt {
                    source,
                    detail: String::from("health check reported unhealthy"),
                    retryable: true,
                });
                continue;
            }

            match invoke(Arc::clone(provider)).await {
                Ok(payload) => {
                    debug!(
                        event = "provider_success",
                        source = source.as_str(),
                        kind = kind.as_str(),
                        ticker = ticker.as_str(),
                        failed_attempts = attempts.len(),
                        latency_ms = started.elapsed().as_millis() as u64,
                    );
                    return Ok(payload);
                }
                Err(error) => {
                    warn!(
                        event = "provider_failed",
                        source = source.as_str(),
                        kind = kind.as_str(),
                        ticker = ticker.as_str(),
                        detail = error.message(),
                    );
                    attempts.push(ChainAttempt {
                        source,
                        detail: error.to_string(),
                        retryable: error.retryable(),
                    });
                }
            }
        }

        let failure = ProviderFailure::from_attempts(kind, ticker.clone(), attempts);
        warn!(
            event = "chain_exhausted",
            kind = kind.as_str(),
            ticker = ticker.as_str(),
            source = failure.source.as_str(),
            detail = failure.detail.as_str(),
            retryable = failure.retryable,
        );
        Err(failure)
    }
}

/// Builder assembling a chain from environment configuration.
///
/// A provider whose API key is absent is simply left out of the candidate
/// list; it never fails the whole chain. Yahoo needs no key and is always a
/// candidate.
///
/// | Provider | Primary env var | Fallback env var |
/// |----------|----------------------------|-------------------|
/// | Finnhub  | `CLEARLOT_FINNHUB_API_KEY` | `FINNHUB_API_KEY` |
/// | FMP      | `CLEARLOT_FMP_API_KEY`     | `FMP_API_KEY`     |
/// | Yahoo    | (no key required)          | -                 |
#[derive(Debug, Default)]
pub struct ProviderChainBuilder {
    use_mock: bool,
    finnhub_api_key: Option<String>,
    fmp_api_key: Option<String>,
    enable_yahoo: bool,
}

impl ProviderChainBuilder {
    pub fn new() -> Self {
        Self {
            use_mock: false,
            finnhub_api_key: None,
            fmp_api_key: None,
            enable_yahoo: true,
        }
    }

    /// All adapters use the mock transport with deterministic payloads.
    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    /// Read API keys from the environment and use real HTTP clients.
    pub fn with_real_clients(mut self) -> Self {
        self.use_mock = false;
        self.finnhub_api_key = env::var("CLEARLOT_FINNHUB_API_KEY")
            .or_else(|_| env::var("FINNHUB_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        self.fmp_api_key = env::var("CLEARLOT_FMP_API_KEY")
            .or_else(|_| env::var("FMP_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_finnhub_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    pub fn with_fmp_key(mut self, key: impl Into<String>) -> Self {
        self.fmp_api_key = Some(key.into());
        self
    }

    pub fn with_yahoo_enabled(mut self, enabled: bool) -> Self {
        self.enable_yahoo = enabled;
        self
    }

    pub fn build(self) -> ProviderChain {
        if self.use_mock {
            return ProviderChain::default();
        }

        let mut providers: Vec<Arc<dyn MarketDataSource>> = Vec::new();

        if let Some(key) = &self.finnhub_api_key {
            let http_client = Arc::new(ReqwestHttpClient::new());
            providers.push(Arc::new(FinnhubAdapter::with_http_client(
                http_client,
                key.clone(),
            )));
        }

        if let Some(key) = &self.fmp_api_key {
            let http_client = Arc::new(ReqwestHttpClient::new());
            providers.push(Arc::new(FmpAdapter::with_http_client(
                http_client,
                key.clone(),
            )));
        }

        if self.enable_yahoo {
            let http_client = Arc::new(ReqwestHttpClient::new());
            providers.push(Arc::new(YahooAdapter::with_http_client(http_client)));
        }

        if providers.is_empty() {
            // Nothing configured at all; fall back to the offline chain so
            // callers still get deterministic behavior instead of a panic.
            return ProviderChain::default();
        }

        ProviderChain::new(providers)
    }
}
