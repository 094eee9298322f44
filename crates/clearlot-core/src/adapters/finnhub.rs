use std::sync::Arc;

use serde::Deserialize;
use time::Duration;

use crate::chain::{NEWS_TTL_SECONDS, PEERS_TTL_SECONDS, QUOTE_TTL_SECONDS};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::data_source::{
    CapabilitySet, FetchError, HealthState, HealthStatus, MarketDataSource, NewsFetch, PeersFetch,
    QuoteFetch,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::{NewsArticle, PeerList, ProviderId, RealtimeQuote, SourceTag, Ticker, UtcDateTime};

const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub adapter. First in every default chain; requires an API key.
#[derive(Clone)]
pub struct FinnhubAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    circuit_breaker: Arc<CircuitBreaker>,
    use_real_api: bool,
}

impl Default for FinnhubAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            api_key: String::from("mock-key"),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            use_real_api: false,
        }
    }
}

impl FinnhubAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            api_key: api_key.into(),
            use_real_api,
            ..Self::default()
        }
    }

    async fn execute(&self, url: &str) -> Result<String, FetchError> {
        if !self.circuit_breaker.allow_request() {
            return Err(FetchError::unavailable(
                "finnhub circuit breaker is open; skipping upstream call",
            ));
        }

        let request = HttpRequest::get(url);
        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            FetchError::unavailable(format!("finnhub transport error: {}", error.message()))
        })?;

        if response.status == 429 {
            self.circuit_breaker.record_failure();
            return Err(FetchError::rate_limited("finnhub returned status 429"));
        }

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(FetchError::unavailable(format!(
                "finnhub returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();
        Ok(response.body)
    }

    async fn fetch_real_quote(&self, req: &QuoteFetch) -> Result<RealtimeQuote, FetchError> {
        let url = format!(
            "{BASE_URL}/quote?symbol={}&token={}",
            urlencoding::encode(req.ticker.as_str()),
            urlencoding::encode(&self.api_key)
        );

        let body = self.execute(&url).await?;
        parse_quote(&req.ticker, &body)
    }

    async fn fetch_real_news(&self, req: &NewsFetch) -> Result<Vec<NewsArticle>, FetchError> {
        let to = UtcDateTime::now().into_inner();
        let from = to - Duration::days(i64::from(req.days_back));
        let url = format!(
            "{BASE_URL}/company-news?symbol={}&from={}&to={}&token={}",
            urlencoding::encode(req.ticker.as_str()),
            from.date(),
            to.date(),
            urlencoding::encode(&self.api_key)
        );

        let body = self.execute(&url).await?;
        parse_news(&req.ticker, &body)
    }

    async fn fetch_real_peers(&self, req: &PeersFetch) -> Result<PeerList, FetchError> {
        let url = format!(
            "{BASE_URL}/stock/peers?symbol={}&token={}",
            urlencoding::encode(req.ticker.as_str()),
            urlencoding::encode(&self.api_key)
        );

        let body = self.execute(&url).await?;
        parse_peers(&req.ticker, &body)
    }
}

impl MarketDataSource for FinnhubAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn quote<'a>(
        &'a self,
        req: QuoteFetch,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RealtimeQuote, FetchError>> + Send + 'a>>
    {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_quote(&req).await
            } else {
                self.execute(&format!("{BASE_URL}/quote")).await?;
                fake_quote(&req.ticker)
            }
        })
    }

    fn news<'a>(
        &'a self,
        req: NewsFetch,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<NewsArticle>, FetchError>> + Send + 'a>>
    {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_news(&req).await
            } else {
                self.execute(&format!("{BASE_URL}/company-news")).await?;
                Ok(fake_news(&req.ticker))
            }
        })
    }

    fn peers<'a>(
        &'a self,
        req: PeersFetch,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<PeerList, FetchError>> + Send + 'a>>
    {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_peers(&req).await
            } else {
                self.execute(&format!("{BASE_URL}/stock/peers")).await?;
                fake_peers(&req.ticker)
            }
        })
    }

    fn health(&self) -> HealthStatus {
        let state = match self.circuit_breaker.state() {
            CircuitState::Closed => HealthState::Healthy,
            CircuitState::HalfOpen => HealthState::Degraded,
            CircuitState::Open => HealthState::Unhealthy,
        };
        HealthStatus::new(state)
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    #[serde(rename = "c")]
    current: Option<f64>,
    #[serde(rename = "d")]
    change: Option<f64>,
    #[serde(rename = "dp")]
    change_pct: Option<f64>,
    #[serde(rename = "pc")]
    previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FinnhubNewsItem {
    headline: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    #[serde(rename = "datetime")]
    published_unix: Option<i64>,
}

fn parse_quote(ticker: &Ticker, body: &str) -> Result<RealtimeQuote, FetchError> {
    let payload: FinnhubQuote = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("finnhub quote parse failed: {e}")))?;

    // Finnhub reports c == 0 for unknown tickers; that is not a quote.
    let price = payload.current.filter(|p| *p > 0.0).ok_or_else(|| {
        FetchError::invalid_payload("finnhub quote price missing or non-positive")
    })?;

    RealtimeQuote::new(
        ticker.clone(),
        price,
        payload.change,
        payload.change_pct,
        payload.previous_close.filter(|p| *p > 0.0),
        SourceTag::fresh(ProviderId::Finnhub, QUOTE_TTL_SECONDS),
    )
    .map_err(|e| FetchError::invalid_payload(e.to_string()))
}

fn parse_news(ticker: &Ticker, body: &str) -> Result<Vec<NewsArticle>, FetchError> {
    let items: Vec<FinnhubNewsItem> = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("finnhub news parse failed: {e}")))?;

    let tag = SourceTag::fresh(ProviderId::Finnhub, NEWS_TTL_SECONDS);
    let articles = items
        .into_iter()
        .filter_map(|item| {
            let headline = item.headline.filter(|h| !h.trim().is_empty())?;
            Some(NewsArticle {
                ticker: ticker.clone(),
                headline,
                summary: item.summary.filter(|s| !s.trim().is_empty()),
                url: item.url,
                published_at: item
                    .published_unix
                    .and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok()),
                tag,
            })
        })
        .collect();

    Ok(articles)
}

fn parse_peers(ticker: &Ticker, body: &str) -> Result<PeerList, FetchError> {
    let symbols: Vec<String> = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("finnhub peers parse failed: {e}")))?;

    let peers: Vec<Ticker> = symbols
        .iter()
        .filter(|symbol| !symbol.eq_ignore_ascii_case(ticker.as_str()))
        .filter_map(|symbol| Ticker::parse(symbol).ok())
        .collect();

    if peers.is_empty() {
        return Err(FetchError::invalid_payload(
            "finnhub returned no usable peers",
        ));
    }

    Ok(PeerList {
        ticker: ticker.clone(),
        peers,
        tag: SourceTag::fresh(ProviderId::Finnhub, PEERS_TTL_SECONDS),
    })
}

fn ticker_seed(ticker: &Ticker) -> u64 {
    ticker.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(byte as u64)
    })
}

fn fake_quote(ticker: &Ticker) -> Result<RealtimeQuote, FetchError> {
    let seed = ticker_seed(ticker);
    let price = 80.0 + (seed % 600) as f64 / 10.0;

    RealtimeQuote::new(
        ticker.clone(),
        price,
        Some(0.42),
        Some(0.42 / price * 100.0),
        Some(price - 0.42),
        SourceTag::fresh(ProviderId::Finnhub, QUOTE_TTL_SECONDS),
    )
    .map_err(|e| FetchError::internal(e.to_string()))
}

fn fake_news(ticker: &Ticker) -> Vec<NewsArticle> {
    let tag = SourceTag::fresh(ProviderId::Finnhub, NEWS_TTL_SECONDS);
    vec![NewsArticle {
        ticker: ticker.clone(),
        headline: format!("{ticker} quarterly results summary"),
        summary: Some(String::from("Deterministic offline article body.")),
        url: Some(format!("https://news.example.test/{ticker}")),
        published_at: Some(UtcDateTime::now()),
        tag,
    }]
}

fn fake_peers(ticker: &Ticker) -> Result<PeerList, FetchError> {
    let peers = ["AAPL", "MSFT", "GOOGL"]
        .into_iter()
        .filter(|symbol| *symbol != ticker.as_str())
        .filter_map(|symbol| Ticker::parse(symbol).ok())
        .collect();

    Ok(PeerList {
        ticker: ticker.clone(),
        peers,
        tag: SourceTag::fresh(ProviderId::Finnhub, PEERS_TTL_SECONDS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).expect("valid ticker")
    }

    #[test]
    fn parses_quote_payload() {
        let body = r#"{"c": 192.5, "d": 1.2, "dp": 0.63, "pc": 191.3}"#;

        let quote = parse_quote(&ticker("AAPL"), body).expect("must parse");

        assert_eq!(quote.price, 192.5);
        assert_eq!(quote.change, Some(1.2));
        assert_eq!(quote.tag.source, ProviderId::Finnhub);
        assert!(!quote.tag.is_stale);
    }

    #[test]
    fn zeroed_quote_is_invalid_payload() {
        let body = r#"{"c": 0, "d": null, "dp": null, "pc": 0}"#;

        let err = parse_quote(&ticker("NOPE"), body).expect_err("must fail");
        assert_eq!(err.kind(), crate::data_source::FetchErrorKind::InvalidPayload);
    }

    #[test]
    fn peers_exclude_the_requested_ticker() {
        let body = r#"["AAPL", "MSFT", "GOOGL"]"#;

        let peers = parse_peers(&ticker("AAPL"), body).expect("must parse");

        assert_eq!(peers.peers.len(), 2);
        assert!(peers.peers.iter().all(|p| p.as_str() != "AAPL"));
    }

    #[test]
    fn empty_peer_list_is_invalid_payload() {
        let err = parse_peers(&ticker("AAPL"), r#"["AAPL"]"#).expect_err("must fail");
        assert_eq!(err.kind(), crate::data_source::FetchErrorKind::InvalidPayload);
    }

    #[tokio::test]
    async fn mock_mode_returns_deterministic_quote() {
        let adapter = FinnhubAdapter::default();
        let req = QuoteFetch::new(ticker("TSLA"));

        let first = adapter.quote(req.clone()).await.expect("must succeed");
        let second = adapter.quote(req).await.expect("must succeed");

        assert_eq!(first.price, second.price);
        assert!(first.price > 0.0);
    }

    #[test]
    fn news_items_without_headline_are_skipped() {
        let body = r#"[{"headline": "Move", "datetime": 1740787200}, {"headline": ""}]"#;

        let articles = parse_news(&ticker("AAPL"), body).expect("must parse");
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].headline, "Move");
    }
}
