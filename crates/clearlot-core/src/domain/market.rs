use serde::{Deserialize, Serialize};

use crate::{ProviderId, Ticker, UtcDateTime, ValidationError};

/// Freshness tag attached to every realtime payload.
///
/// Callers use this to reason about staleness without re-fetching; the chain
/// itself always emits `is_stale == false` and never serves cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTag {
    pub source: ProviderId,
    pub fetched_at: UtcDateTime,
    pub ttl_seconds: u64,
    pub is_stale: bool,
}

impl SourceTag {
    pub fn fresh(source: ProviderId, ttl_seconds: u64) -> Self {
        Self {
            source,
            fetched_at: UtcDateTime::now(),
            ttl_seconds,
            is_stale: false,
        }
    }

    pub fn stale(mut self) -> Self {
        self.is_stale = true;
        self
    }
}

/// Validated top-of-book quote from the provider chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeQuote {
    pub ticker: Ticker,
    pub price: f64,
    pub change: Option<f64>,
    pub change_pct: Option<f64>,
    pub previous_close: Option<f64>,
    pub tag: SourceTag,
}

impl RealtimeQuote {
    pub fn new(
        ticker: Ticker,
        price: f64,
        change: Option<f64>,
        change_pct: Option<f64>,
        previous_close: Option<f64>,
        tag: SourceTag,
    ) -> Result<Self, ValidationError> {
        if !price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        if price <= 0.0 {
            return Err(ValidationError::NonPositivePrice { value: price });
        }
        validate_optional_finite("change", change)?;
        validate_optional_finite("change_pct", change_pct)?;
        validate_optional_non_negative("previous_close", previous_close)?;

        Ok(Self {
            ticker,
            price,
            change,
            change_pct,
            previous_close,
            tag,
        })
    }
}

/// One news item from the provider chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub ticker: Ticker,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<UtcDateTime>,
    pub tag: SourceTag,
}

/// Peer tickers for a symbol, as reported by one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerList {
    pub ticker: Ticker,
    pub peers: Vec<Ticker>,
    pub tag: SourceTag,
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeValue { field });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_quote_price() {
        let ticker = Ticker::parse("AAPL").expect("valid ticker");
        let tag = SourceTag::fresh(ProviderId::Finnhub, 30);
        let err = RealtimeQuote::new(ticker, 0.0, None, None, None, tag).expect_err("must fail");
        assert!(matches!(err, ValidationError::NonPositivePrice { .. }));
    }

    #[test]
    fn fresh_tag_is_not_stale() {
        let tag = SourceTag::fresh(ProviderId::Yahoo, 30);
        assert!(!tag.is_stale);
        assert_eq!(tag.ttl_seconds, 30);
        assert!(tag.stale().is_stale);
    }
}
