use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser, Debug)]
#[command(name = "stockfolio")]
#[command(version, about = "Personal stock portfolio tracker")]
#[command(
    long_about = "Track your stock holdings (symbol, shares, purchase price) in a local database and refresh live prices to see per-position and total profit/loss."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Database file (default: ~/.stockfolio/portfolio.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Configuration file (default: <config dir>/stockfolio/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Add a holding, replacing any existing one for the same symbol
    Add {
        /// Ticker symbol (e.g., AAPL)
        symbol: String,

        /// Number of shares
        #[arg(allow_negative_numbers = true)]
        shares: String,

        /// Purchase price per share
        #[arg(allow_negative_numbers = true)]
        cost_basis: String,
    },

    /// Remove a holding
    #[command(visible_alias = "rm")]
    Remove {
        /// Ticker symbol
        symbol: String,
    },

    /// List holdings
    #[command(visible_alias = "ls")]
    List,

    /// Fetch live prices and show profit/loss
    #[command(visible_alias = "show")]
    Refresh,
}
