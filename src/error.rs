//! Error handling for the portfolio ledger
//!
//! Ledger operations fail with a typed [`LedgerError`] so callers can tell a
//! bad input apart from an unknown symbol or a missing holding. Collaborators
//! (store, quote sources, config) keep using `anyhow` for context chaining;
//! their failures surface through [`LedgerError::Store`].

use thiserror::Error;

/// Core error types for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("holding not found: {0}")]
    NotFound(String),

    /// Per-position during a refresh; degrades the position to unpriced.
    #[error("quote unavailable for {symbol}: {reason}")]
    QuoteUnavailable { symbol: String, reason: String },

    #[error("holdings store error: {0:#}")]
    Store(anyhow::Error),
}

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
