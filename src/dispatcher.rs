//! Command dispatcher: builds the ledger from configuration and routes each
//! parsed subcommand to it, printing the result.

use anyhow::Result;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

use crate::cli::{formatters, Cli, Commands};
use crate::config::Config;
use crate::db::{HoldingsStore, SqliteHoldingsStore};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::pricing::build_quote_source;

/// Route a parsed command line to its handler
pub async fn dispatch_command(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let db_path = config.resolve_db_path(cli.db.clone());
    info!("Using database {:?}", db_path);

    let store = SqliteHoldingsStore::open(db_path).map_err(LedgerError::Store)?;
    let quotes = build_quote_source(&config.pricing)?;
    let mut ledger = Ledger::open(store, quotes, config.ledger_options())?;
    let currency = config.display.currency_symbol.as_str();

    match cli.command {
        Commands::Add {
            symbol,
            shares,
            cost_basis,
        } => {
            let shares = parse_amount("shares", &shares)?;
            let cost_basis = parse_amount("cost basis", &cost_basis)?;
            let holding = ledger.add_holding(&symbol, shares, cost_basis).await?;
            println!("{}", formatters::format_added(&holding, currency, cli.json));
        }
        Commands::Remove { symbol } => {
            let holding = ledger.remove_holding(&symbol)?;
            println!("{}", formatters::format_removed(&holding, cli.json));
        }
        Commands::List => dispatch_list(&ledger, currency, cli.json),
        Commands::Refresh => dispatch_refresh(&ledger, currency, cli.json).await,
    }

    Ok(())
}

fn dispatch_list<S: HoldingsStore>(ledger: &Ledger<S>, currency: &str, json: bool) {
    let holdings = ledger.list_holdings();
    if json {
        println!("{}", formatters::format_holdings_json(holdings));
    } else if holdings.is_empty() {
        print!("{}", formatters::format_empty_portfolio());
    } else {
        print!("{}", formatters::format_holdings_table(holdings, currency));
    }
}

async fn dispatch_refresh<S: HoldingsStore>(ledger: &Ledger<S>, currency: &str, json: bool) {
    if !json && ledger.list_holdings().is_empty() {
        print!("{}", formatters::format_empty_portfolio());
        return;
    }

    let report = ledger.refresh_valuations().await;
    if json {
        println!("{}", formatters::format_report_json(&report));
    } else {
        print!("{}", formatters::format_report_table(&report, currency));
    }
}

/// Parse a numeric command-line argument
fn parse_amount(field: &str, raw: &str) -> std::result::Result<Decimal, LedgerError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| LedgerError::InvalidInput(format!("{} must be a number (got '{}')", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("shares", "10").unwrap(), dec!(10));
        assert_eq!(parse_amount("shares", " 0.25 ").unwrap(), dec!(0.25));
        assert_eq!(parse_amount("shares", "1e3").unwrap(), dec!(1000));
        assert_eq!(parse_amount("shares", "-5").unwrap(), dec!(-5));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        match parse_amount("cost basis", "ten") {
            Err(LedgerError::InvalidInput(msg)) => assert!(msg.contains("cost basis")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }
}
