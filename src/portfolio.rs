//! Portfolio aggregate - ledger plus durable transaction log
//!
//! Every mutation goes validate → append to repository → apply to ledger,
//! so a storage failure never leaves the in-memory positions ahead of the
//! stored log.

use crate::error::{PortfolioError, Result};
use crate::finance::csv_io::TransactionRecord;
use crate::finance::{CostBasisMethod, Ledger, Transaction, TransactionAction, TransactionRepository};
use crate::instrument::Instrument;
use crate::types::{Price, Quantity, TradeDate};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Explicit portfolio handle passed to every operation
#[derive(Debug)]
pub struct Portfolio<R: TransactionRepository> {
    ledger: Ledger,
    repository: R,
}

impl<R: TransactionRepository> Portfolio<R> {
    /// Open a portfolio by replaying the stored transaction log
    pub fn open(repository: R) -> Result<Self> {
        Self::open_with_method(repository, CostBasisMethod::Average)
    }

    pub fn open_with_method(repository: R, method: CostBasisMethod) -> Result<Self> {
        let ledger = Ledger::replay(method, repository.load_all()?)?;
        Ok(Self { ledger, repository })
    }

    /// Buy units of an instrument
    pub fn buy(
        &mut self,
        instrument: Instrument,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<Transaction> {
        self.apply(instrument, TransactionAction::Buy, quantity, price, date)
    }

    /// Sell units of a held instrument
    pub fn sell(
        &mut self,
        instrument: Instrument,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<Transaction> {
        self.apply(instrument, TransactionAction::Sell, quantity, price, date)
    }

    fn apply(
        &mut self,
        instrument: Instrument,
        action: TransactionAction,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<Transaction> {
        let transaction = self.ledger.prepare(instrument, action, quantity, price, date)?;
        self.repository.append(&transaction)?;
        Ok(self.ledger.record(transaction)?.clone())
    }

    /// Apply imported rows in order. Every row is checked against a staged
    /// copy of the ledger first; a rejected row leaves the book untouched.
    pub fn import(&mut self, records: &[TransactionRecord]) -> Result<usize> {
        let mut staged = self.ledger.clone();
        let mut batch = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let transaction = staged
                .prepare(
                    record.instrument(),
                    record.action,
                    record.quantity,
                    record.price,
                    record.date,
                )
                .and_then(|txn| staged.record(txn).map(|txn| txn.clone()))
                .map_err(|e| {
                    log::warn!("Import rejected at row {}: {}", index + 1, e);
                    e
                })?;
            batch.push(transaction);
        }

        self.repository.append_all(&batch)?;
        self.ledger = staged;
        log::info!("Imported {} transactions", batch.len());
        Ok(batch.len())
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

/// Single-writer shared handle to a portfolio
#[derive(Debug)]
pub struct SharedPortfolio<R: TransactionRepository> {
    inner: Arc<RwLock<Portfolio<R>>>,
}

impl<R: TransactionRepository> Clone for SharedPortfolio<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: TransactionRepository> SharedPortfolio<R> {
    pub fn new(portfolio: Portfolio<R>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(portfolio)),
        }
    }

    /// Shared read access for valuation and analytics
    pub fn read(&self) -> Result<RwLockReadGuard<'_, Portfolio<R>>> {
        self.inner.read().map_err(|_| PortfolioError::LockPoisoned)
    }

    /// Exclusive write access; mutations are serialized here
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Portfolio<R>>> {
        self.inner.write().map_err(|_| PortfolioError::LockPoisoned)
    }

    pub fn buy(
        &self,
        instrument: Instrument,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<Transaction> {
        self.write()?.buy(instrument, quantity, price, date)
    }

    pub fn sell(
        &self,
        instrument: Instrument,
        quantity: Quantity,
        price: Price,
        date: TradeDate,
    ) -> Result<Transaction> {
        self.write()?.sell(instrument, quantity, price, date)
    }

    /// Run a closure against a consistent view of the ledger
    pub fn with_ledger<T>(&self, f: impl FnOnce(&Ledger) -> T) -> Result<T> {
        Ok(f(self.read()?.ledger()))
    }
}
