//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::db::Holding;
use crate::reports::{PortfolioReport, Valuation};
use crate::utils::{format_currency_with, format_percent, format_shares};

fn colored_signed(text: String, value: Decimal) -> String {
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

/// Format holdings for terminal table output
pub fn format_holdings_table(holdings: &[Holding], currency: &str) -> String {
    #[derive(Tabled)]
    struct HoldingRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Shares")]
        shares: String,
        #[tabled(rename = "Cost Basis")]
        cost_basis: String,
        #[tabled(rename = "Date Added")]
        acquired_on: String,
    }

    let rows: Vec<HoldingRow> = holdings
        .iter()
        .map(|h| HoldingRow {
            symbol: h.symbol.clone(),
            shares: format_shares(h.shares),
            cost_basis: format_currency_with(h.cost_basis, currency),
            acquired_on: h.acquired_on.format("%Y-%m-%d").to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..3), Alignment::right());

    format!("\n{} Holdings\n\n{}\n", "📊".cyan().bold(), table)
}

/// Format holdings as JSON (decimals as strings)
pub fn format_holdings_json(holdings: &[Holding]) -> String {
    serde_json::to_string_pretty(holdings)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Format a valuation report for terminal table output
pub fn format_report_table(report: &PortfolioReport, currency: &str) -> String {
    let mut output = format!("\n{} Portfolio\n\n", "📊".cyan().bold());

    #[derive(Tabled)]
    struct PositionRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Shares")]
        shares: String,
        #[tabled(rename = "Cost Basis")]
        cost_basis: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Gain/Loss")]
        gain_loss: String,
        #[tabled(rename = "Return %")]
        return_pct: String,
    }

    let na = || "N/A".to_string();

    let rows: Vec<PositionRow> = report
        .positions
        .iter()
        .map(|p| {
            let (price, value, gain_loss, return_pct) = match &p.valuation {
                Valuation::Priced(v) => (
                    format_currency_with(v.price, currency),
                    format_currency_with(v.market_value, currency),
                    colored_signed(format_currency_with(v.gain_loss, currency), v.gain_loss),
                    colored_signed(format_percent(v.gain_loss_pct), v.gain_loss_pct),
                ),
                Valuation::Unpriced { .. } => (na(), na(), na(), na()),
            };

            PositionRow {
                symbol: p.holding.symbol.clone(),
                shares: format_shares(p.holding.shares),
                cost_basis: format_currency_with(p.holding.cost_basis, currency),
                price,
                value,
                gain_loss,
                return_pct,
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    // Right-align all columns except Symbol (0)
    table.modify(Columns::new(1..), Alignment::right());
    output.push_str(&table.to_string());

    let unpriced: Vec<&str> = report
        .positions
        .iter()
        .filter_map(|p| match &p.valuation {
            Valuation::Unpriced { .. } => Some(p.holding.symbol.as_str()),
            Valuation::Priced(_) => None,
        })
        .collect();
    if !unpriced.is_empty() {
        output.push_str(&format!(
            "\n{} No price available for: {} (excluded from totals)",
            "⚠".yellow().bold(),
            unpriced.join(", ")
        ));
    }

    let s = &report.summary;
    output.push_str(&format!("\n\n{} Summary", "━".repeat(60).bright_black()));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Total Invested:".bold(),
        format_currency_with(s.total_cost, currency)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Current Value:".bold(),
        format_currency_with(s.total_market, currency)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Profit/Loss:".bold(),
        colored_signed(format_currency_with(s.total_gain_loss, currency), s.total_gain_loss)
    ));
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Return:".bold(),
        colored_signed(format_percent(s.total_gain_loss_pct), s.total_gain_loss_pct)
    ));

    output
}

/// Format a valuation report as JSON (decimals as strings)
pub fn format_report_json(report: &PortfolioReport) -> String {
    serde_json::to_string_pretty(report)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Confirmation after an add, as text or JSON
pub fn format_added(holding: &Holding, currency: &str, json: bool) -> String {
    if json {
        return to_json(holding);
    }
    format!(
        "{} {} added to portfolio: {} shares at {} ({})",
        "✓".green().bold(),
        holding.symbol.bold(),
        format_shares(holding.shares),
        format_currency_with(holding.cost_basis, currency),
        holding.acquired_on.format("%Y-%m-%d")
    )
}

/// Confirmation after a removal, as text or JSON
pub fn format_removed(holding: &Holding, json: bool) -> String {
    if json {
        return to_json(holding);
    }
    format!(
        "{} {} removed from portfolio",
        "✓".green().bold(),
        holding.symbol.bold()
    )
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Format empty portfolio message
pub fn format_empty_portfolio() -> String {
    format!(
        "{} No holdings yet\nAdd one using: {} add <SYMBOL> <SHARES> <COST_BASIS>\n",
        "ℹ".blue().bold(),
        "stockfolio".bold()
    )
}
