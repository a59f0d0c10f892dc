//! Instrument representations

use crate::error::{PortfolioError, Result};
use crate::types::Symbol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Class of a held instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Listed stock
    Equity,
    /// Mutual fund units, priced at NAV
    MutualFund,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::MutualFund => "mutual_fund",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Equity => write!(f, "Equity"),
            AssetClass::MutualFund => write!(f, "Mutual Fund"),
        }
    }
}

impl FromStr for AssetClass {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" | "stock" => Ok(AssetClass::Equity),
            "mutual_fund" | "mutualfund" | "mf" | "fund" => Ok(AssetClass::MutualFund),
            other => Err(PortfolioError::ParseError(format!(
                "Unknown asset class '{}'",
                other
            ))),
        }
    }
}

/// Ledger identity of an instrument.
///
/// An equity and a fund sharing a code are tracked as separate positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub asset_class: AssetClass,
    pub symbol: Symbol,
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.asset_class)
    }
}

/// Tradable instrument (immutable)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker or fund code
    pub symbol: Symbol,
    /// Equity or mutual fund
    pub asset_class: AssetClass,
    /// Display name
    pub name: Option<String>,
}

impl Instrument {
    /// Create a new instrument
    pub fn new(symbol: impl Into<Symbol>, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            asset_class,
            name: None,
        }
    }

    /// Create an equity instrument
    pub fn equity(symbol: impl Into<Symbol>) -> Self {
        Self::new(symbol, AssetClass::Equity)
    }

    /// Create a mutual fund instrument
    pub fn mutual_fund(code: impl Into<Symbol>) -> Self {
        Self::new(code, AssetClass::MutualFund)
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn key(&self) -> InstrumentKey {
        InstrumentKey {
            asset_class: self.asset_class,
            symbol: self.symbol.clone(),
        }
    }

    /// Name for display, falling back to the symbol
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.symbol)
    }

    pub fn is_mutual_fund(&self) -> bool {
        self.asset_class == AssetClass::MutualFund
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instrument({}, {})", self.symbol, self.asset_class)
    }
}
