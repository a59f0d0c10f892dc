//! Transaction - one entry of the append-only ledger log
//!
//! A Transaction is written for every accepted buy or sell. It is never
//! mutated or deleted; its `sequence` number is the audit order.

use crate::error::{PortfolioError, Result};
use crate::instrument::Instrument;
use crate::types::{Cash, Price, Quantity, TradeDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Transaction ID
pub type TransactionId = Uuid;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionAction {
    Buy,
    #[serde(alias = "redeem")]
    Sell,
}

impl TransactionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionAction::Buy => "buy",
            TransactionAction::Sell => "sell",
        }
    }
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionAction {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TransactionAction::Buy),
            "sell" | "redeem" => Ok(TransactionAction::Sell),
            other => Err(PortfolioError::ParseError(format!(
                "Unknown transaction action '{}'",
                other
            ))),
        }
    }
}

/// Immutable ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: TransactionId,
    /// Position in the audit trail (assigned by the ledger)
    pub sequence: u64,
    /// Instrument traded, including its asset class
    pub instrument: Instrument,
    /// Buy or sell
    pub action: TransactionAction,
    /// Units traded (always positive)
    pub quantity: Quantity,
    /// Price or NAV per unit
    pub price: Price,
    /// Trade date
    pub date: TradeDate,
}

impl Transaction {
    /// Create a new transaction with a fresh ID
    pub fn new(
        sequence: u64,
        instrument: Instrument,
        action: TransactionAction,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            instrument,
            action,
            quantity,
            price,
            date,
        }
    }

    /// Get total transaction value (price * quantity)
    pub fn value(&self) -> Cash {
        self.price * self.quantity
    }

    /// Quantity with sign: positive for buys, negative for sells
    pub fn signed_quantity(&self) -> Quantity {
        match self.action {
            TransactionAction::Buy => self.quantity,
            TransactionAction::Sell => -self.quantity,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self.action, TransactionAction::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self.action, TransactionAction::Sell)
    }
}
