//! Ledger System - Transaction log and weighted-average positions
//!
//! The ledger is the single source of truth for holdings. Every accepted
//! buy or sell is appended to the transaction log; positions are the
//! materialized view of that log and can be rebuilt with [`Ledger::replay`].
//!
//! Average price is recomputed on buys only. Sells reduce quantity and
//! produce a [`RealizedGain`] record according to the configured
//! [`CostBasisMethod`], but never touch the blended average.

use crate::error::{PortfolioError, Result};
use crate::finance::constants::ZERO_TOLERANCE;
use crate::finance::transaction::{Transaction, TransactionAction, TransactionId};
use crate::instrument::{Instrument, InstrumentKey};
use crate::types::{Cash, Price, Quantity, TradeDate};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Cost basis method used to compute realized gains on sells
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostBasisMethod {
    /// First In, First Out
    FIFO,
    /// Last In, First Out
    LIFO,
    /// Blended average cost
    Average,
}

/// Lot - one purchase with its own cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Units remaining in this lot
    pub quantity: Quantity,
    /// Purchase price per unit
    pub price: Price,
    /// Purchase date
    pub acquired_on: TradeDate,
    /// Transaction that opened this lot
    pub transaction_id: TransactionId,
}

impl Lot {
    pub fn new(
        quantity: Quantity,
        price: Price,
        acquired_on: TradeDate,
        transaction_id: TransactionId,
    ) -> Self {
        Self {
            quantity,
            price,
            acquired_on,
            transaction_id,
        }
    }

    /// Total cost of this lot
    pub fn total_cost(&self) -> Cash {
        self.quantity * self.price
    }
}

/// Held position with weighted-average cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument held
    pub instrument: Instrument,
    /// Units held, never negative
    pub quantity: Quantity,
    average_price: Price,
    acquired_on: TradeDate,
    lots: VecDeque<Lot>,
}

impl Position {
    fn open(instrument: Instrument, lot: Lot) -> Self {
        Self {
            instrument,
            quantity: lot.quantity,
            average_price: lot.price,
            acquired_on: lot.acquired_on,
            lots: VecDeque::from([lot]),
        }
    }

    /// Add a buy (creates new lot, blends the average price)
    fn add_units(&mut self, lot: Lot) {
        let total_cost = self.quantity * self.average_price + lot.total_cost();
        self.quantity += lot.quantity;
        self.average_price = total_cost / self.quantity;
        self.lots.push_back(lot);
    }

    /// Remove units and return the cost of the units sold
    fn remove_units(&mut self, quantity: Quantity, method: CostBasisMethod) -> Cash {
        let mut cost_of_units_sold = 0.0;

        match method {
            CostBasisMethod::FIFO | CostBasisMethod::LIFO => {
                let mut remaining = quantity;
                while remaining > ZERO_TOLERANCE {
                    let lot = match method {
                        CostBasisMethod::FIFO => self.lots.front_mut(),
                        _ => self.lots.back_mut(),
                    };
                    let Some(lot) = lot else { break };

                    if lot.quantity <= remaining + ZERO_TOLERANCE {
                        cost_of_units_sold += lot.total_cost();
                        remaining -= lot.quantity;
                        if method == CostBasisMethod::FIFO {
                            self.lots.pop_front();
                        } else {
                            self.lots.pop_back();
                        }
                    } else {
                        cost_of_units_sold += remaining * lot.price;
                        lot.quantity -= remaining;
                        remaining = 0.0;
                    }
                }
            }
            CostBasisMethod::Average => {
                cost_of_units_sold = quantity * self.average_price;

                let removal_ratio = (quantity / self.quantity).min(1.0);
                for lot in &mut self.lots {
                    lot.quantity *= 1.0 - removal_ratio;
                }
                self.lots.retain(|lot| lot.quantity > ZERO_TOLERANCE);
            }
        }

        self.quantity = (self.quantity - quantity).max(0.0);
        cost_of_units_sold
    }

    /// Weighted-average acquisition price
    pub fn average_price(&self) -> Price {
        self.average_price
    }

    /// Date of the first purchase
    pub fn acquired_on(&self) -> TradeDate {
        self.acquired_on
    }

    /// Remaining purchase lots
    pub fn lots(&self) -> &VecDeque<Lot> {
        &self.lots
    }

    /// Quantity times average price
    pub fn cost_basis(&self) -> Cash {
        self.quantity * self.average_price
    }

    pub fn market_value(&self, current_price: Price) -> Cash {
        self.quantity * current_price
    }

    pub fn unrealized_gain(&self, current_price: Price) -> Cash {
        self.market_value(current_price) - self.cost_basis()
    }

    pub fn is_flat(&self) -> bool {
        self.quantity <= ZERO_TOLERANCE
    }
}

/// Gain realized by one sell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedGain {
    pub transaction_id: TransactionId,
    pub instrument: InstrumentKey,
    pub date: TradeDate,
    pub quantity: Quantity,
    pub proceeds: Cash,
    pub cost: Cash,
    pub gain: Cash,
}

/// Realized P&L summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnLSummary {
    /// Total realized P&L
    pub realized_pnl: Cash,
    /// Number of sells closed at a gain
    pub winning_trades: usize,
    /// Number of sells closed at a loss
    pub losing_trades: usize,
    /// Total number of sells
    pub total_trades: usize,
    /// Win rate
    pub win_rate: f64,
}

impl PnLSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trade(&mut self, pnl: Cash) {
        self.realized_pnl += pnl;
        self.total_trades += 1;

        if pnl > 0.0 {
            self.winning_trades += 1;
        } else if pnl < 0.0 {
            self.losing_trades += 1;
        }

        self.win_rate = self.winning_trades as f64 / self.total_trades as f64;
    }
}

/// Ledger - append-only transaction log plus derived positions
#[derive(Debug, Clone)]
pub struct Ledger {
    /// All transactions, in insertion order
    transactions: Vec<Transaction>,
    /// Open positions
    positions: HashMap<InstrumentKey, Position>,
    /// Method for realized gains
    cost_basis_method: CostBasisMethod,
    /// One record per sell
    realized: Vec<RealizedGain>,
    /// P&L summary
    pnl_summary: PnLSummary,
    next_sequence: u64,
}

impl Ledger {
    /// Create new ledger with specified cost basis method
    pub fn new(cost_basis_method: CostBasisMethod) -> Self {
        Self {
            transactions: Vec::new(),
            positions: HashMap::new(),
            cost_basis_method,
            realized: Vec::new(),
            pnl_summary: PnLSummary::new(),
            next_sequence: 0,
        }
    }

    /// Rebuild a ledger from a stored transaction log
    pub fn replay<I>(cost_basis_method: CostBasisMethod, transactions: I) -> Result<Self>
    where
        I: IntoIterator<Item = Transaction>,
    {
        let mut ledger = Self::new(cost_basis_method);
        for transaction in transactions {
            ledger.record(transaction)?;
        }
        log::info!(
            "Replayed {} transactions into {} open positions",
            ledger.transaction_count(),
            ledger.open_position_count()
        );
        Ok(ledger)
    }

    /// Buy `quantity` units at `price`.
    ///
    /// Existing positions blend their average price and keep their original
    /// acquisition date.
    pub fn add(
        &mut self,
        instrument: Instrument,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<&Transaction> {
        let transaction = self.prepare(instrument, TransactionAction::Buy, quantity, price, date)?;
        self.record(transaction)
    }

    /// Sell `quantity` units at `price`.
    ///
    /// Fails without side effects when the instrument is not held or the
    /// quantity exceeds the holding.
    pub fn remove(
        &mut self,
        instrument: &Instrument,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<&Transaction> {
        let transaction = self.prepare(
            instrument.clone(),
            TransactionAction::Sell,
            quantity,
            price,
            date,
        )?;
        self.record(transaction)
    }

    /// Build the next transaction and validate it against current state
    /// without mutating the ledger.
    pub fn prepare(
        &self,
        instrument: Instrument,
        action: TransactionAction,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<Transaction> {
        let transaction =
            Transaction::new(self.next_sequence, instrument, action, quantity, price, date);
        self.validate(&transaction)?;
        Ok(transaction)
    }

    /// Check a transaction against the current holdings
    pub fn validate(&self, transaction: &Transaction) -> Result<()> {
        let symbol = &transaction.instrument.symbol;

        if !transaction.quantity.is_finite() || transaction.quantity <= 0.0 {
            return Err(PortfolioError::InvalidTransaction(format!(
                "Quantity for {} must be positive, got {}",
                symbol, transaction.quantity
            )));
        }

        match transaction.action {
            TransactionAction::Buy => {
                if !transaction.price.is_finite() || transaction.price <= 0.0 {
                    return Err(PortfolioError::InvalidTransaction(format!(
                        "Purchase price for {} must be positive, got {}",
                        symbol, transaction.price
                    )));
                }
            }
            TransactionAction::Sell => {
                if !transaction.price.is_finite() || transaction.price < 0.0 {
                    return Err(PortfolioError::InvalidTransaction(format!(
                        "Sell price for {} must not be negative, got {}",
                        symbol, transaction.price
                    )));
                }

                let position = self
                    .positions
                    .get(&transaction.instrument.key())
                    .ok_or_else(|| PortfolioError::UnknownInstrument(symbol.clone()))?;

                if transaction.quantity > position.quantity + ZERO_TOLERANCE {
                    return Err(PortfolioError::InsufficientQuantity {
                        symbol: symbol.clone(),
                        requested: transaction.quantity,
                        held: position.quantity,
                    });
                }
            }
        }

        Ok(())
    }

    /// Validate and apply a transaction, then append it to the log
    pub fn record(&mut self, transaction: Transaction) -> Result<&Transaction> {
        self.validate(&transaction)?;

        let key = transaction.instrument.key();
        match transaction.action {
            TransactionAction::Buy => {
                let lot = Lot::new(
                    transaction.quantity,
                    transaction.price,
                    transaction.date,
                    transaction.id,
                );
                match self.positions.get_mut(&key) {
                    Some(position) => {
                        if position.instrument.name.is_none() {
                            position.instrument.name = transaction.instrument.name.clone();
                        }
                        position.add_units(lot);
                    }
                    None => {
                        self.positions.insert(
                            key.clone(),
                            Position::open(transaction.instrument.clone(), lot),
                        );
                    }
                }
                log::info!(
                    "Bought {} {} @ {:.4}",
                    transaction.quantity,
                    key,
                    transaction.price
                );
            }
            TransactionAction::Sell => {
                let method = self.cost_basis_method;
                let position = self
                    .positions
                    .get_mut(&key)
                    .ok_or_else(|| PortfolioError::UnknownInstrument(key.symbol.clone()))?;

                let cost = position.remove_units(transaction.quantity, method);
                let proceeds = transaction.value();
                let gain = proceeds - cost;

                if position.is_flat() {
                    self.positions.remove(&key);
                    log::info!("Closed position {}", key);
                }

                self.pnl_summary.add_trade(gain);
                self.realized.push(RealizedGain {
                    transaction_id: transaction.id,
                    instrument: key.clone(),
                    date: transaction.date,
                    quantity: transaction.quantity,
                    proceeds,
                    cost,
                    gain,
                });
                log::info!(
                    "Sold {} {} @ {:.4} (realized {:.2})",
                    transaction.quantity,
                    key,
                    transaction.price,
                    gain
                );
            }
        }

        self.next_sequence = self.next_sequence.max(transaction.sequence + 1);
        self.transactions.push(transaction);
        let index = self.transactions.len() - 1;
        Ok(&self.transactions[index])
    }

    /// Get position for an instrument
    pub fn position(&self, instrument: &Instrument) -> Option<&Position> {
        self.positions.get(&instrument.key())
    }

    pub fn position_by_key(&self, key: &InstrumentKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Open positions ordered by asset class then symbol
    pub fn positions(&self) -> Vec<&Position> {
        let mut positions: Vec<&Position> = self.positions.values().collect();
        positions.sort_by(|a, b| a.instrument.key().cmp(&b.instrument.key()));
        positions
    }

    /// Total investment at cost across open positions
    pub fn total_cost(&self) -> Cash {
        self.positions.values().map(|p| p.cost_basis()).sum()
    }

    /// Get all transactions
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Get transactions for an instrument
    pub fn transactions_for(&self, key: &InstrumentKey) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|txn| &txn.instrument.key() == key)
            .collect()
    }

    /// Get transactions in date range (inclusive)
    pub fn transactions_in_range(&self, start: TradeDate, end: TradeDate) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|txn| txn.date >= start && txn.date <= end)
            .collect()
    }

    pub fn realized_gains(&self) -> &[RealizedGain] {
        &self.realized
    }

    pub fn pnl_summary(&self) -> &PnLSummary {
        &self.pnl_summary
    }

    pub fn cost_basis_method(&self) -> CostBasisMethod {
        self.cost_basis_method
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(CostBasisMethod::Average)
    }
}
