use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{Quote, QuoteSource};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance quote response
#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<DailySeries>,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

/// Quote source backed by the Yahoo Finance chart API
pub struct YahooQuoteSource {
    client: Client,
    base_url: String,
    symbol_suffix: String,
}

impl YahooQuoteSource {
    /// `symbol_suffix` is appended to every ticker (e.g. `.SA` for B3 listings).
    pub fn new(symbol_suffix: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; StockfolioBot/1.0)")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            symbol_suffix: symbol_suffix.into(),
        })
    }

    /// Point the client at another chart endpoint (mirrors, local fixtures)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/{}{}?range=1d&interval=1d", self.base_url, symbol, self.symbol_suffix)
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        let url = self.chart_url(symbol);
        info!("Fetching current price for {} from Yahoo Finance", symbol);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to Yahoo Finance")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Yahoo Finance returned error status: {}",
                response.status()
            ));
        }

        let data: YahooQuoteResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo Finance response")?;

        parse_chart_response(symbol, data)
    }
}

/// Extract the latest price from a chart response.
///
/// Prefers `regularMarketPrice`; falls back to the last non-null daily close.
fn parse_chart_response(symbol: &str, data: YahooQuoteResponse) -> Result<Quote> {
    if let Some(error) = data.chart.error {
        return Err(anyhow!(
            "Yahoo Finance API error: {} - {}",
            error.code,
            error.description
        ));
    }

    let result = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("No data returned from Yahoo Finance"))?;

    let last_close = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .and_then(|q| q.close)
        .and_then(|closes| closes.into_iter().rev().flatten().next());

    let price = result
        .meta
        .regular_market_price
        .or(last_close)
        .ok_or_else(|| anyhow!("No price data available for {}", symbol))?;

    let price = Decimal::from_f64(price)
        .ok_or_else(|| anyhow!("Invalid price value {} for {}", price, symbol))?
        .normalize();

    debug!("Yahoo price for {}: {}", symbol, price);

    let mut quote = Quote::new(symbol, price);
    quote.currency = result.meta.currency;
    Ok(quote)
}
