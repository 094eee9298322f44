use std::sync::Arc;

use serde::Deserialize;

use crate::chain::{NEWS_TTL_SECONDS, PEERS_TTL_SECONDS, QUOTE_TTL_SECONDS};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::data_source::{
    CapabilitySet, FetchError, HealthState, HealthStatus, MarketDataSource, NewsFetch, PeersFetch,
    QuoteFetch,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::{NewsArticle, PeerList, ProviderId, RealtimeQuote, SourceTag, Ticker, UtcDateTime};

const BASE_URL: &str = "https://financialmodelingprep.com/api";

/// Financial Modeling Prep adapter. Second in the default chains.
#[derive(Clone)]
pub struct FmpAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    circuit_breaker: Arc<CircuitBreaker>,
    use_real_api: bool,
}

impl Default for FmpAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            api_key: String::from("mock-key"),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            use_real_api: false,
        }
    }
}

impl FmpAdapter {
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
                "fmp circuit breaker is open; skipping upstream call",
            ));
        }

        let request = HttpRequest::get(url);
        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            FetchError::unavailable(format!("fmp transport error: {}", error.message()))
        })?;

        if response.status == 429 {
            self.circuit_breaker.record_failure();
            return Err(FetchError::rate_limited("fmp returned status 429"));
        }

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(FetchError::unavailable(format!(
                "fmp returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();
        Ok(response.body)
    }
}

impl MarketDataSource for FmpAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Fmp
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
                let url = format!(
                    "{BASE_URL}/v3/quote/{}?apikey={}",
                    urlencoding::encode(req.ticker.as_str()),
                    urlencoding::encode(&self.api_key)
                );
                let body = self.execute(&url).await?;
                parse_quote(&req.ticker, &body)
            } else {
                self.execute(&format!("{BASE_URL}/v3/quote")).await?;
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
                let url = format!(
                    "{BASE_URL}/v3/stock_news?tickers={}&limit=50&apikey={}",
                    urlencoding::encode(req.ticker.as_str()),
                    urlencoding::encode(&self.api_key)
                );
                let body = self.execute(&url).await?;
                parse_news(&req.ticker, &body)
            } else {
                self.execute(&format!("{BASE_URL}/v3/stock_news")).await?;
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
                let url = format!(
                    "{BASE_URL}/v4/stock_peers?symbol={}&apikey={}",
                    urlencoding::encode(req.ticker.as_str()),
                    urlencoding::encode(&self.api_key)
                );
                let body = self.execute(&url).await?;
                parse_peers(&req.ticker, &body)
            } else {
                self.execute(&format!("{BASE_URL}/v4/stock_peers")).await?;
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
struct FmpQuote {
    price: Option<f64>,
    change: Option<f64>,
    #[serde(rename = "changesPercentage")]
    changes_percentage: Option<f64>,
    #[serde(rename = "previousClose")]
    previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FmpNewsItem {
    title: Option<String>,
    text: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FmpPeers {
    #[serde(rename = "peersList", default)]
    peers_list: Vec<String>,
}

fn parse_quote(ticker: &Ticker, body: &str) -> Result<RealtimeQuote, FetchError> {
    let payload: Vec<FmpQuote> = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("fmp quote parse failed: {e}")))?;

    let first = payload
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::invalid_payload("fmp quote response was empty"))?;

    let price = first
        .price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| FetchError::invalid_payload("fmp quote price missing or non-positive"))?;

    RealtimeQuote::new(
        ticker.clone(),
        price,
        first.change,
        first.changes_percentage,
        first.previous_close.filter(|p| *p > 0.0),
        SourceTag::fresh(ProviderId::Fmp, QUOTE_TTL_SECONDS),
    )
    .map_err(|e| FetchError::invalid_payload(e.to_string()))
}

fn parse_news(ticker: &Ticker, body: &str) -> Result<Vec<NewsArticle>, FetchError> {
    let items: Vec<FmpNewsItem> = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("fmp news parse failed: {e}")))?;

    let tag = SourceTag::fresh(ProviderId::Fmp, NEWS_TTL_SECONDS);
    let articles = items
        .into_iter()
        .filter_map(|item| {
            let headline = item.title.filter(|t| !t.trim().is_empty())?;
            Some(NewsArticle {
                ticker: ticker.clone(),
                headline,
                summary: item.text.filter(|t| !t.trim().is_empty()),
                url: item.url,
                published_at: item.published_date.as_deref().and_then(parse_fmp_datetime),
                tag,
            })
        })
        .collect();

    Ok(articles)
}

/// FMP renders timestamps as "2025-03-01 14:30:00" in UTC.
fn parse_fmp_datetime(value: &str) -> Option<UtcDateTime> {
    let rfc3339 = format!("{}Z", value.trim().replacen(' ', "T", 1));
    UtcDateTime::parse(&rfc3339).ok()
}

fn parse_peers(ticker: &Ticker, body: &str) -> Result<PeerList, FetchError> {
    let payload: Vec<FmpPeers> = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("fmp peers parse failed: {e}")))?;

    let peers: Vec<Ticker> = payload
        .into_iter()
        .flat_map(|entry| entry.peers_list)
        .filter(|symbol| !symbol.eq_ignore_ascii_case(ticker.as_str()))
        .filter_map(|symbol| Ticker::parse(&symbol).ok())
        .collect();

    if peers.is_empty() {
        return Err(FetchError::invalid_payload("fmp returned no usable peers"));
    }

    Ok(PeerList {
        ticker: ticker.clone(),
        peers,
        tag: SourceTag::fresh(ProviderId::Fmp, PEERS_TTL_SECONDS),
    })
}

fn ticker_seed(ticker: &Ticker) -> u64 {
    ticker.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(31).wrapping_add(byte as u64)
    })
}

fn fake_quote(ticker: &Ticker) -> Result<RealtimeQuote, FetchError> {
    let seed = ticker_seed(ticker);
    let price = 75.0 + (seed % 700) as f64 / 10.0;

    RealtimeQuote::new(
        ticker.clone(),
        price,
        Some(-0.18),
        Some(-0.18 / price * 100.0),
        Some(price + 0.18),
        SourceTag::fresh(ProviderId::Fmp, QUOTE_TTL_SECONDS),
    )
    .map_err(|e| FetchError::internal(e.to_string()))
}

fn fake_news(ticker: &Ticker) -> Vec<NewsArticle> {
    let tag = SourceTag::fresh(ProviderId::Fmp, NEWS_TTL_SECONDS);
    vec![NewsArticle {
        ticker: ticker.clone(),
        headline: format!("{ticker} analyst coverage update"),
        summary: None,
        url: Some(format!("https://fmp.example.test/{ticker}")),
        published_at: Some(UtcDateTime::now()),
        tag,
    }]
}

fn fake_peers(ticker: &Ticker) -> Result<PeerList, FetchError> {
    let peers = ["NVDA", "AMD", "INTC"]
        .into_iter()
        .filter(|symbol| *symbol != ticker.as_str())
        .filter_map(|symbol| Ticker::parse(symbol).ok())
        .collect();

    Ok(PeerList {
        ticker: ticker.clone(),
        peers,
        tag: SourceTag::fresh(ProviderId::Fmp, PEERS_TTL_SECONDS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).expect("valid ticker")
    }

    #[test]
    fn parses_quote_array_payload() {
        let body = r#"[{"price": 431.2, "change": -2.1, "changesPercentage": -0.48, "previousClose": 433.3}]"#;

        let quote = parse_quote(&ticker("MSFT"), body).expect("must parse");

        assert_eq!(quote.price, 431.2);
        assert_eq!(quote.tag.source, ProviderId::Fmp);
    }

    #[test]
    fn empty_quote_array_is_invalid_payload() {
        let err = parse_quote(&ticker("MSFT"), "[]").expect_err("must fail");
        assert_eq!(err.kind(), crate::data_source::FetchErrorKind::InvalidPayload);
    }

    #[test]
    fn parses_fmp_datetime_format() {
        let parsed = parse_fmp_datetime("2025-03-01 14:30:00").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2025-03-01T14:30:00Z");
        assert_eq!(parse_fmp_datetime("not a date"), None);
    }

    #[test]
    fn peers_payload_flattens_and_filters() {
        let body = r#"[{"symbol": "MSFT", "peersList": ["AAPL", "MSFT", "GOOGL"]}]"#;

        let peers = parse_peers(&ticker("MSFT"), body).expect("must parse");

        assert_eq!(peers.peers.len(), 2);
    }

    #[tokio::test]
    async fn mock_quote_differs_from_finnhub_seed() {
        let adapter = FmpAdapter::default();
        let quote = adapter
            .quote(QuoteFetch::new(ticker("TSLA")))
            .await
            .expect("must succeed");
        assert!(quote.price > 0.0);
        assert_eq!(quote.tag.source, ProviderId::Fmp);
    }
}
