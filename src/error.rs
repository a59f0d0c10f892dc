//! Error types for rusty-portfolio

use thiserror::Error;

/// Main error type for rusty-portfolio
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Insufficient quantity for {symbol}: requested {requested}, held {held}")]
    InsufficientQuantity {
        symbol: String,
        requested: f64,
        held: f64,
    },

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Quote unavailable for {symbol}: {reason}")]
    QuoteUnavailable {
        symbol: String,
        reason: String,
        transient: bool,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Portfolio lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PortfolioError {
    /// Permanent quote failure (bad symbol, no data)
    pub fn quote_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QuoteUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
            transient: false,
        }
    }

    /// Transient quote failure (timeout, rate limit, 5xx)
    pub fn quote_transient(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QuoteUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
            transient: true,
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::QuoteUnavailable {
                transient: true,
                ..
            } | Self::IoError(_)
        )
    }

    /// Validation failures leave the ledger untouched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownInstrument(_)
                | Self::InsufficientQuantity { .. }
                | Self::InvalidTransaction(_)
        )
    }
}

/// Result type alias for rusty-portfolio operations
pub type Result<T> = std::result::Result<T, PortfolioError>;
