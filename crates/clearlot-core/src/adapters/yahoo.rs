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

/// Yahoo adapter. Last in the default chains; needs no API key and serves
/// as the keyless fallback.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    use_real_api: bool,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            use_real_api: false,
        }
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            use_real_api,
            ..Self::default()
        }
    }

    async fn execute(&self, url: &str) -> Result<String, FetchError> {
        if !self.circuit_breaker.allow_request() {
            return Err(FetchError::unavailable(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        let request =
            HttpRequest::get(url).with_header("referer", "https://finance.yahoo.com/");
        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            FetchError::unavailable(format!("yahoo transport error: {}", error.message()))
        })?;

        if response.status == 429 {
            self.circuit_breaker.record_failure();
            return Err(FetchError::rate_limited("yahoo returned status 429"));
        }

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(FetchError::unavailable(format!(
                "yahoo returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();
        Ok(response.body)
    }
}

impl MarketDataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
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
                    "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=1d&interval=1d",
                    urlencoding::encode(req.ticker.as_str())
                );
                let body = self.execute(&url).await?;
                parse_chart_quote(&req.ticker, &body)
            } else {
                self.execute("https://query1.finance.yahoo.com/v8/finance/chart")
                    .await?;
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
                    "https://query2.finance.yahoo.com/v1/finance/search?q={}&newsCount=20&quotesCount=0",
                    urlencoding::encode(req.ticker.as_str())
                );
                let body = self.execute(&url).await?;
                parse_news(&req.ticker, &body)
            } else {
                self.execute("https://query2.finance.yahoo.com/v1/finance/search")
                    .await?;
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
                    "https://query1.finance.yahoo.com/v6/finance/recommendationsbysymbol/{}",
                    urlencoding::encode(req.ticker.as_str())
                );
                let body = self.execute(&url).await?;
                parse_peers(&req.ticker, &body)
            } else {
                self.execute("https://query1.finance.yahoo.com/v6/finance/recommendationsbysymbol")
                    .await?;
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
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Vec<YahooChartResult>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    meta: YahooChartMeta,
}

#[derive(Debug, Deserialize)]
struct YahooChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooSearchResponse {
    #[serde(default)]
    news: Vec<YahooNewsItem>,
}

#[derive(Debug, Deserialize)]
struct YahooNewsItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "providerPublishTime")]
    provider_publish_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct YahooRecommendationResponse {
    finance: YahooRecommendationFinance,
}

#[derive(Debug, Deserialize)]
struct YahooRecommendationFinance {
    #[serde(default)]
    result: Vec<YahooRecommendationResult>,
}

#[derive(Debug, Deserialize)]
struct YahooRecommendationResult {
    #[serde(rename = "recommendedSymbols", default)]
    recommended_symbols: Vec<YahooRecommendedSymbol>,
}

#[derive(Debug, Deserialize)]
struct YahooRecommendedSymbol {
    symbol: String,
}

fn parse_chart_quote(ticker: &Ticker, body: &str) -> Result<RealtimeQuote, FetchError> {
    let payload: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("yahoo chart parse failed: {e}")))?;

    if payload.chart.error.as_ref().is_some_and(|e| !e.is_null()) {
        return Err(FetchError::invalid_payload("yahoo chart reported an error"));
    }

    let meta = payload
        .chart
        .result
        .first()
        .map(|result| &result.meta)
        .ok_or_else(|| FetchError::invalid_payload("yahoo chart response had no result"))?;

    let price = meta
        .regular_market_price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| FetchError::invalid_payload("yahoo quote price missing or non-positive"))?;

    let previous_close = meta.chart_previous_close.filter(|p| *p > 0.0);
    let change = previous_close.map(|pc| price - pc);
    let change_pct = previous_close.map(|pc| (price - pc) / pc * 100.0);

    RealtimeQuote::new(
        ticker.clone(),
        price,
        change,
        change_pct,
        previous_close,
        SourceTag::fresh(ProviderId::Yahoo, QUOTE_TTL_SECONDS),
    )
    .map_err(|e| FetchError::invalid_payload(e.to_string()))
}

fn parse_news(ticker: &Ticker, body: &str) -> Result<Vec<NewsArticle>, FetchError> {
    let payload: YahooSearchResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("yahoo news parse failed: {e}")))?;

    let tag = SourceTag::fresh(ProviderId::Yahoo, NEWS_TTL_SECONDS);
    let articles = payload
        .news
        .into_iter()
        .filter_map(|item| {
            let headline = item.title.filter(|t| !t.trim().is_empty())?;
            Some(NewsArticle {
                ticker: ticker.clone(),
                headline,
                summary: None,
                url: item.link,
                published_at: item
                    .provider_publish_time
                    .and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok()),
                tag,
            })
        })
        .collect();

    Ok(articles)
}

fn parse_peers(ticker: &Ticker, body: &str) -> Result<PeerList, FetchError> {
    let payload: YahooRecommendationResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::invalid_payload(format!("yahoo peers parse failed: {e}")))?;

    let peers: Vec<Ticker> = payload
        .finance
        .result
        .into_iter()
        .flat_map(|result| result.recommended_symbols)
        .filter(|entry| !entry.symbol.eq_ignore_ascii_case(ticker.as_str()))
        .filter_map(|entry| Ticker::parse(&entry.symbol).ok())
        .collect();

    if peers.is_empty() {
        return Err(FetchError::invalid_payload(
            "yahoo returned no usable peers",
        ));
    }

    Ok(PeerList {
        ticker: ticker.clone(),
        peers,
        tag: SourceTag::fresh(ProviderId::Yahoo, PEERS_TTL_SECONDS),
    })
}

fn ticker_seed(ticker: &Ticker) -> u64 {
    ticker.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(37).wrapping_add(byte as u64)
    })
}

fn fake_quote(ticker: &Ticker) -> Result<RealtimeQuote, FetchError> {
    let seed = ticker_seed(ticker);
    let price = 90.0 + (seed % 500) as f64 / 10.0;

    RealtimeQuote::new(
        ticker.clone(),
        price,
        Some(0.11),
        Some(0.11 / price * 100.0),
        Some(price - 0.11),
        SourceTag::fresh(ProviderId::Yahoo, QUOTE_TTL_SECONDS),
    )
    .map_err(|e| FetchError::internal(e.to_string()))
}

fn fake_news(ticker: &Ticker) -> Vec<NewsArticle> {
    let tag = SourceTag::fresh(ProviderId::Yahoo, NEWS_TTL_SECONDS);
    vec![NewsArticle {
        ticker: ticker.clone(),
        headline: format!("{ticker} market wrap"),
        summary: None,
        url: Some(format!("https://finance.example.test/{ticker}")),
        published_at: Some(UtcDateTime::now()),
        tag,
    }]
}

fn fake_peers(ticker: &Ticker) -> Result<PeerList, FetchError> {
    let peers = ["SPY", "QQQ", "DIA"]
        .into_iter()
        .filter(|symbol| *symbol != ticker.as_str())
        .filter_map(|symbol| Ticker::parse(symbol).ok())
        .collect();

    Ok(PeerList {
        ticker: ticker.clone(),
        peers,
        tag: SourceTag::fresh(ProviderId::Yahoo, PEERS_TTL_SECONDS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).expect("valid ticker")
    }

    #[test]
    fn parses_chart_meta_quote() {
        let body = r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 184.2, "chartPreviousClose": 182.0}}], "error": null}}"#;

        let quote = parse_chart_quote(&ticker("AAPL"), body).expect("must parse");

        assert_eq!(quote.price, 184.2);
        assert_eq!(quote.previous_close, Some(182.0));
        assert!(quote.change.is_some_and(|c| (c - 2.2).abs() < 1e-9));
        assert_eq!(quote.tag.source, ProviderId::Yahoo);
    }

    #[test]
    fn chart_error_is_invalid_payload() {
        let body = r#"{"chart": {"result": [], "error": {"code": "Not Found"}}}"#;

        let err = parse_chart_quote(&ticker("NOPE"), body).expect_err("must fail");
        assert_eq!(err.kind(), crate::data_source::FetchErrorKind::InvalidPayload);
    }

    #[test]
    fn parses_recommended_symbols_as_peers() {
        let body = r#"{"finance": {"result": [{"recommendedSymbols": [{"symbol": "MSFT"}, {"symbol": "AAPL"}]}]}}"#;

        let peers = parse_peers(&ticker("AAPL"), body).expect("must parse");

        assert_eq!(peers.peers.len(), 1);
        assert_eq!(peers.peers[0].as_str(), "MSFT");
    }

    #[tokio::test]
    async fn mock_mode_serves_offline_news() {
        let adapter = YahooAdapter::default();
        let req = NewsFetch::new(ticker("TSLA"), 7).expect("valid request");

        let articles = adapter.news(req).await.expect("must succeed");

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].tag.source, ProviderId::Yahoo);
    }
}
