//! Stockfolio - personal stock portfolio tracker
//!
//! Holdings (symbol, shares, per-share cost basis) are kept in a local SQLite
//! database and valued against live quotes to report per-position and total
//! profit/loss. The [`ledger::Ledger`] is the core; the CLI is a thin layer
//! over it.

pub mod cli;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod pricing;
pub mod reports;
pub mod utils;
