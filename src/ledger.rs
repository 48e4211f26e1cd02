//! Portfolio ledger
//!
//! Owns the authoritative in-memory set of holdings, kept in sync with a
//! [`HoldingsStore`], and values them against a [`QuoteSource`].
//!
//! Every mutation writes to the store before touching memory, so a failed
//! operation leaves the ledger exactly as it was. Mutations take `&mut self`
//! and refreshes take `&self`: holdings cannot change while a refresh is
//! enumerating them.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::db::{normalize_symbol, Holding, HoldingsStore, MAX_AMOUNT, MIN_COST_VALUE};
use crate::error::{LedgerError, Result};
use crate::pricing::{Quote, QuoteSource};
use crate::reports::{
    build_report, value_position, PortfolioReport, PositionReport, Valuation, OUT_OF_RANGE,
};

/// Tuning for quote lookups
#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Per-quote timeout; a lookup that exceeds it is unresolved
    pub quote_timeout: Duration,
    /// Maximum concurrent quote requests during a refresh
    pub max_concurrent_quotes: usize,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(10),
            max_concurrent_quotes: 5,
        }
    }
}

pub struct Ledger<S> {
    store: S,
    quotes: Arc<dyn QuoteSource>,
    holdings: Vec<Holding>,
    options: LedgerOptions,
}

impl<S: HoldingsStore> Ledger<S> {
    /// Build a ledger over `store`, loading every persisted holding.
    pub fn open(store: S, quotes: Arc<dyn QuoteSource>, options: LedgerOptions) -> Result<Self> {
        let holdings = store.list_all().map_err(LedgerError::Store)?;
        info!(
            "Loaded {} holdings (quotes from {})",
            holdings.len(),
            quotes.name()
        );

        Ok(Self {
            store,
            quotes,
            holdings,
            options,
        })
    }

    /// All holdings: store order on load, then insertion order.
    pub fn list_holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        let symbol = normalize_symbol(symbol);
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add a holding, replacing any existing one for the same symbol.
    ///
    /// The symbol must resolve to a quote. The stored holding is dated today.
    pub async fn add_holding(
        &mut self,
        symbol: &str,
        shares: Decimal,
        cost_basis: Decimal,
    ) -> Result<Holding> {
        let symbol = validate_holding_input(symbol, shares, cost_basis)?;

        let quote = fetch_quote(self.quotes.as_ref(), &symbol, self.options.quote_timeout)
            .await
            .map_err(|e| {
                warn!("Rejecting {}: {}", symbol, e);
                LedgerError::UnknownSymbol(symbol.clone())
            })?;
        debug!("{} is tradable at {}", symbol, quote.price);

        let holding = Holding::new(symbol, shares, cost_basis, today());
        self.store.upsert(&holding).map_err(LedgerError::Store)?;

        match self.holdings.iter_mut().find(|h| h.symbol == holding.symbol) {
            Some(existing) => {
                info!("Replaced holding {}", holding.symbol);
                *existing = holding.clone();
            }
            None => {
                info!("Added holding {}", holding.symbol);
                self.holdings.push(holding.clone());
            }
        }

        Ok(holding)
    }

    /// Remove the holding for `symbol`, returning it.
    pub fn remove_holding(&mut self, symbol: &str) -> Result<Holding> {
        let symbol = normalize_symbol(symbol);
        let index = self
            .holdings
            .iter()
            .position(|h| h.symbol == symbol)
            .ok_or_else(|| LedgerError::NotFound(symbol.clone()))?;

        let existed = self.store.delete(&symbol).map_err(LedgerError::Store)?;
        if !existed {
            warn!("Holding {} was missing from the store", symbol);
        }

        info!("Removed holding {}", symbol);
        Ok(self.holdings.remove(index))
    }

    /// Price every holding and compute the portfolio figures.
    ///
    /// Never fails: a holding whose quote cannot be resolved (error, timeout,
    /// implausible price) is reported as unpriced and left out of the summary.
    pub async fn refresh_valuations(&self) -> PortfolioReport {
        let total = self.holdings.len();
        info!("Refreshing valuations for {} holdings", total);

        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_quotes.max(1)));
        let mut join_set = JoinSet::new();

        for (index, holding) in self.holdings.iter().enumerate() {
            let sem = semaphore.clone();
            let quotes = Arc::clone(&self.quotes);
            let symbol = holding.symbol.clone();
            let timeout = self.options.quote_timeout;

            join_set.spawn(async move {
                // Acquire semaphore permit (limits concurrent requests)
                let _permit = sem.acquire().await;
                (index, fetch_quote(quotes.as_ref(), &symbol, timeout).await)
            });
        }

        let mut results: Vec<Option<Result<Quote>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => warn!("Quote task failed: {}", e),
            }
        }

        let positions: Vec<PositionReport> = self
            .holdings
            .iter()
            .zip(results)
            .map(|(holding, result)| {
                let valuation = match result {
                    Some(Ok(quote)) => match value_position(holding, quote.price) {
                        Some(v) => Valuation::Priced(v),
                        None => {
                            warn!("{} at {}: {}", holding.symbol, quote.price, OUT_OF_RANGE);
                            Valuation::Unpriced {
                                reason: OUT_OF_RANGE.to_string(),
                            }
                        }
                    },
                    Some(Err(e)) => {
                        warn!("{}", e);
                        Valuation::Unpriced {
                            reason: unpriced_reason(e),
                        }
                    }
                    None => Valuation::Unpriced {
                        reason: "quote lookup aborted".to_string(),
                    },
                };
                PositionReport {
                    holding: holding.clone(),
                    valuation,
                }
            })
            .collect();

        let report = build_report(positions);
        info!(
            "Refreshed {} priced, {} unpriced",
            report.summary.priced_count, report.summary.unpriced_count
        );
        report
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Normalize and check add-holding arguments, returning the symbol.
fn validate_holding_input(symbol: &str, shares: Decimal, cost_basis: Decimal) -> Result<String> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(LedgerError::InvalidInput("symbol must not be empty".to_string()));
    }
    if symbol.chars().any(char::is_whitespace) {
        return Err(LedgerError::InvalidInput(format!(
            "symbol must not contain whitespace (got '{}')",
            symbol
        )));
    }

    for (field, value) in [("shares", shares), ("cost basis", cost_basis)] {
        if value <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "{} must be positive (got {})",
                field, value
            )));
        }
        if value > MAX_AMOUNT {
            return Err(LedgerError::InvalidInput(format!(
                "{} must not exceed {} (got {})",
                field, MAX_AMOUNT, value
            )));
        }
    }

    // Both factors are at most MAX_AMOUNT, so the product fits
    let cost_value = shares * cost_basis;
    if cost_value < MIN_COST_VALUE {
        return Err(LedgerError::InvalidInput(format!(
            "shares x cost basis must be at least {} (got {})",
            MIN_COST_VALUE, cost_value
        )));
    }

    Ok(symbol)
}

/// Look up a quote with a timeout, rejecting prices outside `0..=MAX_AMOUNT`.
async fn fetch_quote(quotes: &dyn QuoteSource, symbol: &str, timeout: Duration) -> Result<Quote> {
    let unavailable = |reason: String| LedgerError::QuoteUnavailable {
        symbol: symbol.to_string(),
        reason,
    };

    let quote = match tokio::time::timeout(timeout, quotes.latest_quote(symbol)).await {
        Err(_) => return Err(unavailable(format!("timed out after {:?}", timeout))),
        Ok(Err(e)) => return Err(unavailable(format!("{:#}", e))),
        Ok(Ok(quote)) => quote,
    };

    if quote.price < Decimal::ZERO {
        return Err(unavailable(format!("negative price {}", quote.price)));
    }
    if quote.price > MAX_AMOUNT {
        return Err(unavailable(format!("implausible price {}", quote.price)));
    }

    Ok(quote)
}

fn unpriced_reason(err: LedgerError) -> String {
    match err {
        LedgerError::QuoteUnavailable { reason, .. } => reason,
        other => other.to_string(),
    }
}
