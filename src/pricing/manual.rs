use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use super::{Quote, QuoteSource};

/// Fixed prices keyed by symbol, optionally layered over another source.
///
/// Symbols with a manual price never reach the fallback. Without a fallback
/// every other symbol is unresolved, which is how offline mode works.
pub struct ManualQuotes {
    prices: HashMap<String, Decimal>,
    fallback: Option<Box<dyn QuoteSource>>,
}

impl ManualQuotes {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self {
            prices,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn QuoteSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn set_price(&mut self, symbol: impl Into<String>, price: Decimal) {
        self.prices.insert(symbol.into(), price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for ManualQuotes {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl QuoteSource for ManualQuotes {
    fn name(&self) -> &str {
        match &self.fallback {
            Some(fallback) => fallback.name(),
            None => "manual",
        }
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        if let Some(price) = self.prices.get(symbol) {
            debug!("Using manual price for {}: {}", symbol, price);
            return Ok(Quote::new(symbol, *price));
        }

        match &self.fallback {
            Some(fallback) => fallback.latest_quote(symbol).await,
            None => Err(anyhow!("No manual price configured for {}", symbol)),
        }
    }
}
