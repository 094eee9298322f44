//! Caller-owned quote cache.
//!
//! The provider chain never caches; freshness policy belongs to whoever owns
//! this object. Entries expire by the TTL carried on their own source tag,
//! and expired entries are only ever handed back explicitly marked stale.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::{RealtimeQuote, Ticker};

/// Cache behavior for a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh entry when present, otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then overwrite the stored entry.
    Refresh,
    /// Always fetch; neither read nor write the cache.
    Bypass,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: RealtimeQuote,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed().as_secs() < self.quote.tag.ttl_seconds
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
}

/// Thread-safe per-ticker quote cache with an explicit lifecycle.
#[derive(Debug, Clone, Default)]
pub struct QuoteCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh entry for the ticker, or `None` when absent or expired.
    pub async fn get_fresh(&self, ticker: &Ticker) -> Option<RealtimeQuote> {
        let store = self.inner.read().await;
        store
            .map
            .get(ticker.as_str())
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.quote.clone())
    }

    /// Any stored entry for the ticker; expired entries come back with their
    /// tag marked stale so callers cannot mistake them for live data.
    pub async fn get_any(&self, ticker: &Ticker) -> Option<RealtimeQuote> {
        let store = self.inner.read().await;
        store.map.get(ticker.as_str()).map(|entry| {
            let mut quote = entry.quote.clone();
            if !entry.is_fresh() {
                quote.tag = quote.tag.stale();
            }
            quote
        })
    }

    /// Mode-aware read: `Use` serves fresh entries, `Refresh` and `Bypass`
    /// always miss so the caller re-fetches.
    pub async fn lookup(&self, mode: CacheMode, ticker: &Ticker) -> Option<RealtimeQuote> {
        match mode {
            CacheMode::Use => self.get_fresh(ticker).await,
            CacheMode::Refresh | CacheMode::Bypass => None,
        }
    }

    /// Mode-aware write: `Bypass` never touches the store.
    pub async fn store(&self, mode: CacheMode, quote: &RealtimeQuote) {
        if mode != CacheMode::Bypass {
            self.put(quote.clone()).await;
        }
    }

    pub async fn put(&self, quote: RealtimeQuote) {
        let mut store = self.inner.write().await;
        store.map.insert(
            quote.ticker.as_str().to_owned(),
            CacheEntry {
                quote,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderId, SourceTag};

    fn quote(symbol: &str, ttl_seconds: u64) -> RealtimeQuote {
        RealtimeQuote::new(
            Ticker::parse(symbol).expect("valid ticker"),
            100.0,
            None,
            None,
            None,
            SourceTag::fresh(ProviderId::Yahoo, ttl_seconds),
        )
        .expect("valid quote")
    }

    #[tokio::test]
    async fn fresh_entry_round_trips() {
        let cache = QuoteCache::new();
        let ticker = Ticker::parse("AAPL").expect("valid ticker");

        cache.put(quote("AAPL", 60)).await;

        let cached = cache.get_fresh(&ticker).await.expect("entry present");
        assert_eq!(cached.price, 100.0);
        assert!(!cached.tag.is_stale);
    }

    #[tokio::test]
    async fn expired_entry_is_not_fresh_but_comes_back_stale() {
        let cache = QuoteCache::new();
        let ticker = Ticker::parse("AAPL").expect("valid ticker");

        // TTL of zero expires immediately.
        cache.put(quote("AAPL", 0)).await;

        assert!(cache.get_fresh(&ticker).await.is_none());
        let stale = cache.get_any(&ticker).await.expect("entry present");
        assert!(stale.tag.is_stale);
    }

    #[tokio::test]
    async fn refresh_and_bypass_modes_always_miss() {
        let cache = QuoteCache::new();
        let ticker = Ticker::parse("AAPL").expect("valid ticker");
        let fetched = quote("AAPL", 60);

        cache.store(CacheMode::Use, &fetched).await;

        assert!(cache.lookup(CacheMode::Use, &ticker).await.is_some());
        assert!(cache.lookup(CacheMode::Refresh, &ticker).await.is_none());
        assert!(cache.lookup(CacheMode::Bypass, &ticker).await.is_none());

        cache.clear().await;
        cache.store(CacheMode::Bypass, &fetched).await;
        assert!(cache.is_empty().await, "bypass never writes");
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let cache = QuoteCache::new();
        cache.put(quote("AAPL", 60)).await;
        cache.put(quote("MSFT", 60)).await;
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
