//! CSV import/export of the transaction log
//!
//! CSV format: date,action,symbol,asset_class,quantity,price,name

use crate::error::{PortfolioError, Result};
use crate::finance::transaction::{Transaction, TransactionAction};
use crate::instrument::{AssetClass, Instrument};
use crate::types::{Price, Quantity, TradeDate};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// One CSV row. Ids and sequence numbers are assigned by the ledger on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: TradeDate,
    pub action: TransactionAction,
    pub symbol: String,
    pub asset_class: AssetClass,
    pub quantity: Quantity,
    pub price: Price,
    #[serde(default)]
    pub name: Option<String>,
}

impl TransactionRecord {
    pub fn instrument(&self) -> Instrument {
        let instrument = Instrument::new(self.symbol.clone(), self.asset_class);
        match &self.name {
            Some(name) if !name.is_empty() => instrument.with_name(name.clone()),
            _ => instrument,
        }
    }
}

impl From<&Transaction> for TransactionRecord {
    fn from(txn: &Transaction) -> Self {
        Self {
            date: txn.date,
            action: txn.action,
            symbol: txn.instrument.symbol.clone(),
            asset_class: txn.instrument.asset_class,
            quantity: txn.quantity,
            price: txn.price,
            name: txn.instrument.name.clone(),
        }
    }
}

/// Parse transaction rows from any reader
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line, result) in reader.deserialize::<TransactionRecord>().enumerate() {
        let record = result.map_err(|e| {
            PortfolioError::ParseError(format!("Invalid transaction row {}: {}", line + 1, e))
        })?;
        records.push(record);
    }

    log::debug!("Parsed {} transaction rows", records.len());
    Ok(records)
}

/// Parse transaction rows from a CSV file
pub fn read_transactions_from_path(path: &Path) -> Result<Vec<TransactionRecord>> {
    let file = std::fs::File::open(path)?;
    read_transactions(file)
}

/// Write the transaction log as CSV
pub fn write_transactions<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for txn in transactions {
        writer.serialize(TransactionRecord::from(txn))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the transaction log to a CSV file
pub fn write_transactions_to_path(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_transactions(file, transactions)
}
