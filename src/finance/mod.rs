//! Finance module - ledger, transactions, persistence

pub mod constants;
pub mod csv_io;
pub mod ledger;
pub mod repository;
pub mod transaction;

pub use ledger::{CostBasisMethod, Ledger, Lot, PnLSummary, Position, RealizedGain};
#[cfg(feature = "rusqlite-support")]
pub use repository::SqliteRepository;
pub use repository::{InMemoryRepository, TransactionRepository};
pub use transaction::{Transaction, TransactionAction, TransactionId};
