// Pricing module - quote sources (Yahoo Finance, manual prices) and caching

pub mod manual;
pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::config::{PricingConfig, ProviderKind};
pub use manual::ManualQuotes;
pub use yahoo::YahooQuoteSource;

/// Latest traded price for a symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub as_of: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            currency: None,
            as_of: Utc::now(),
        }
    }
}

/// Source of live prices.
///
/// Any error means "unresolved": the ledger does not distinguish an unknown
/// symbol from a transient fetch failure.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    async fn latest_quote(&self, symbol: &str) -> Result<Quote>;
}

#[async_trait]
impl<T: QuoteSource + ?Sized> QuoteSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        (**self).latest_quote(symbol).await
    }
}

/// Price cache entry
#[derive(Debug, Clone)]
struct CacheEntry {
    quote: Quote,
    timestamp: DateTime<Utc>,
}

/// Quote source wrapper with a TTL cache.
///
/// Failed lookups are not cached.
pub struct CachedQuoteSource<Q> {
    inner: Q,
    cache: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl<Q: QuoteSource> CachedQuoteSource<Q> {
    pub fn new(inner: Q, ttl: std::time::Duration) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::zero()),
        }
    }

    fn cached(&self, symbol: &str) -> Option<Quote> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let entry = cache.get(symbol)?;
        let age = Utc::now().signed_duration_since(entry.timestamp);
        if age < self.ttl {
            debug!("Using cached price for {} (age: {}s)", symbol, age.num_seconds());
            Some(entry.quote.clone())
        } else {
            None
        }
    }

    /// Clear cache
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.clear();
        info!("Price cache cleared");
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.len()
    }
}

#[async_trait]
impl<Q: QuoteSource> QuoteSource for CachedQuoteSource<Q> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        if let Some(quote) = self.cached(symbol) {
            return Ok(quote);
        }

        let quote = self.inner.latest_quote(symbol).await?;

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(
            symbol.to_string(),
            CacheEntry {
                quote: quote.clone(),
                timestamp: Utc::now(),
            },
        );
        Ok(quote)
    }
}

/// Build the quote source described by the pricing configuration.
///
/// Manual prices always win; with the `offline` provider they are the only
/// source.
pub fn build_quote_source(config: &PricingConfig) -> Result<Arc<dyn QuoteSource>> {
    let manual = config.manual_prices()?;

    let source: Arc<dyn QuoteSource> = match config.provider {
        ProviderKind::Offline => {
            info!("Using offline quote source ({} manual prices)", manual.len());
            Arc::new(ManualQuotes::new(manual))
        }
        ProviderKind::Yahoo => {
            let yahoo = YahooQuoteSource::new(config.symbol_suffix.clone(), config.timeout())?;
            let layered = ManualQuotes::new(manual).with_fallback(Box::new(yahoo));
            Arc::new(CachedQuoteSource::new(layered, config.cache_ttl()))
        }
    };

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl QuoteSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("no data for {}", symbol));
            }
            Ok(Quote::new(symbol, dec!(42.5)))
        }
    }

    fn counting(fail: bool) -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[tokio::test]
    async fn test_price_cache_reuses_quote_within_ttl() {
        let source = CachedQuoteSource::new(counting(false), std::time::Duration::from_secs(300));

        let first = source.latest_quote("AAPL").await.unwrap();
        let second = source.latest_quote("AAPL").await.unwrap();

        assert_eq!(first.price, dec!(42.5));
        assert_eq!(first, second);
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_price_cache_refetches_after_clear() {
        let source = CachedQuoteSource::new(counting(false), std::time::Duration::from_secs(300));

        source.latest_quote("AAPL").await.unwrap();
        source.clear_cache();
        assert_eq!(source.cache_size(), 0);
        source.latest_quote("AAPL").await.unwrap();

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let source = CachedQuoteSource::new(counting(false), std::time::Duration::ZERO);

        source.latest_quote("AAPL").await.unwrap();
        source.latest_quote("AAPL").await.unwrap();

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = CachedQuoteSource::new(counting(true), std::time::Duration::from_secs(300));

        assert!(source.latest_quote("ZZZZ").await.is_err());
        assert!(source.latest_quote("ZZZZ").await.is_err());

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_offline_source_serves_manual_prices_only() {
        let mut config = PricingConfig::default();
        config.provider = ProviderKind::Offline;
        config.manual.insert("aapl".to_string(), dec!(180.00));

        let source = build_quote_source(&config).unwrap();

        let quote = source.latest_quote("AAPL").await.unwrap();
        assert_eq!(quote.price, dec!(180.00));
        assert!(source.latest_quote("MSFT").await.is_err());
    }
}
