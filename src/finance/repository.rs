//! Durable transaction log
//!
//! The repository stores the append-only transaction log; positions are
//! always rebuilt from it with [`Ledger::replay`](crate::finance::Ledger::replay).

use crate::error::Result;
use crate::finance::transaction::Transaction;

/// Append-only storage for ledger transactions
pub trait TransactionRepository {
    /// Persist one transaction. Existing rows are never updated.
    fn append(&mut self, transaction: &Transaction) -> Result<()>;

    /// Persist a batch in order. Stores that support it write the batch
    /// atomically; the default appends one by one.
    fn append_all(&mut self, transactions: &[Transaction]) -> Result<()> {
        transactions.iter().try_for_each(|txn| self.append(txn))
    }

    /// Load every stored transaction ordered by sequence number
    fn load_all(&self) -> Result<Vec<Transaction>>;
}

/// Session-only repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    transactions: Vec<Transaction>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TransactionRepository for InMemoryRepository {
    fn append(&mut self, transaction: &Transaction) -> Result<()> {
        self.transactions.push(transaction.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Transaction>> {
        let mut transactions = self.transactions.clone();
        transactions.sort_by_key(|txn| txn.sequence);
        Ok(transactions)
    }
}

#[cfg(feature = "rusqlite-support")]
pub use self::sqlite::SqliteRepository;

#[cfg(feature = "rusqlite-support")]
mod sqlite {
    use super::TransactionRepository;
    use crate::error::{PortfolioError, Result};
    use crate::finance::transaction::{Transaction, TransactionAction};
    use crate::instrument::{AssetClass, Instrument};
    use chrono::NaiveDate;
    use rusqlite::{params, Connection};
    use std::path::Path;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Transaction log backed by SQLite
    pub struct SqliteRepository {
        conn: Mutex<Connection>,
    }

    struct StoredRow {
        id: String,
        sequence: i64,
        symbol: String,
        asset_class: String,
        name: Option<String>,
        action: String,
        quantity: f64,
        price: f64,
        trade_date: String,
    }

    impl SqliteRepository {
        /// Create or open database at path
        pub fn new(db_path: &Path) -> Result<Self> {
            let conn = Connection::open(db_path).map_err(|e| {
                PortfolioError::StorageError(format!("Failed to open database: {}", e))
            })?;
            Self::with_connection(conn)
        }

        /// Create in-memory database (for testing)
        pub fn new_in_memory() -> Result<Self> {
            let conn = Connection::open_in_memory().map_err(|e| {
                PortfolioError::StorageError(format!("Failed to create in-memory database: {}", e))
            })?;
            Self::with_connection(conn)
        }

        fn with_connection(conn: Connection) -> Result<Self> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS transactions (
                    id TEXT PRIMARY KEY,
                    sequence INTEGER NOT NULL UNIQUE,
                    symbol TEXT NOT NULL,
                    asset_class TEXT NOT NULL,
                    name TEXT,
                    action TEXT NOT NULL,
                    quantity REAL NOT NULL,
                    price REAL NOT NULL,
                    trade_date TEXT NOT NULL
                )",
                [],
            )
            .map_err(|e| {
                PortfolioError::StorageError(format!("Failed to create transactions table: {}", e))
            })?;

            Ok(Self {
                conn: Mutex::new(conn),
            })
        }

        /// Number of stored transactions
        pub fn count(&self) -> Result<usize> {
            let conn = self.conn.lock().map_err(|_| PortfolioError::LockPoisoned)?;
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
                .map_err(|e| {
                    PortfolioError::StorageError(format!("Failed to count transactions: {}", e))
                })?;
            Ok(count as usize)
        }

        fn insert(conn: &Connection, transaction: &Transaction) -> Result<()> {
            conn.execute(
                "INSERT INTO transactions (id, sequence, symbol, asset_class, name, action, quantity, price, trade_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    transaction.id.to_string(),
                    transaction.sequence as i64,
                    &transaction.instrument.symbol,
                    transaction.instrument.asset_class.as_str(),
                    &transaction.instrument.name,
                    transaction.action.as_str(),
                    transaction.quantity,
                    transaction.price,
                    transaction.date.format("%Y-%m-%d").to_string(),
                ],
            )
            .map_err(|e| PortfolioError::StorageError(format!("Failed to append transaction: {}", e)))?;

            log::debug!("Stored transaction {} (#{})", transaction.id, transaction.sequence);
            Ok(())
        }

        fn to_transaction(row: StoredRow) -> Result<Transaction> {
            let id = Uuid::parse_str(&row.id).map_err(|e| {
                PortfolioError::StorageError(format!("Corrupt transaction id {}: {}", row.id, e))
            })?;
            let asset_class: AssetClass = row.asset_class.parse()?;
            let action: TransactionAction = row.action.parse()?;
            let date = NaiveDate::parse_from_str(&row.trade_date, "%Y-%m-%d").map_err(|e| {
                PortfolioError::StorageError(format!(
                    "Corrupt trade date {}: {}",
                    row.trade_date, e
                ))
            })?;

            let mut instrument = Instrument::new(row.symbol, asset_class);
            instrument.name = row.name;

            Ok(Transaction {
                id,
                sequence: row.sequence as u64,
                instrument,
                action,
                quantity: row.quantity,
                price: row.price,
                date,
            })
        }
    }

    impl TransactionRepository for SqliteRepository {
        fn append(&mut self, transaction: &Transaction) -> Result<()> {
            let conn = self.conn.lock().map_err(|_| PortfolioError::LockPoisoned)?;
            Self::insert(&conn, transaction)
        }

        fn append_all(&mut self, transactions: &[Transaction]) -> Result<()> {
            let mut conn = self.conn.lock().map_err(|_| PortfolioError::LockPoisoned)?;
            let tx = conn.transaction().map_err(|e| {
                PortfolioError::StorageError(format!("Failed to begin batch: {}", e))
            })?;
            for transaction in transactions {
                Self::insert(&tx, transaction)?;
            }
            tx.commit()
                .map_err(|e| PortfolioError::StorageError(format!("Failed to commit batch: {}", e)))?;

            log::debug!("Stored batch of {} transactions", transactions.len());
            Ok(())
        }

        fn load_all(&self) -> Result<Vec<Transaction>> {
            let conn = self.conn.lock().map_err(|_| PortfolioError::LockPoisoned)?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, sequence, symbol, asset_class, name, action, quantity, price, trade_date
                     FROM transactions ORDER BY sequence",
                )
                .map_err(|e| PortfolioError::StorageError(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(StoredRow {
                        id: row.get(0)?,
                        sequence: row.get(1)?,
                        symbol: row.get(2)?,
                        asset_class: row.get(3)?,
                        name: row.get(4)?,
                        action: row.get(5)?,
                        quantity: row.get(6)?,
                        price: row.get(7)?,
                        trade_date: row.get(8)?,
                    })
                })
                .map_err(|e| PortfolioError::StorageError(format!("Failed to load transactions: {}", e)))?;

            let mut transactions = Vec::new();
            for row in rows {
                let row = row.map_err(|e| {
                    PortfolioError::StorageError(format!("Failed to read transaction row: {}", e))
                })?;
                transactions.push(Self::to_transaction(row)?);
            }

            Ok(transactions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::transaction::TransactionAction;
    use crate::instrument::Instrument;
    use chrono::NaiveDate;

    fn txn(sequence: u64, symbol: &str) -> Transaction {
        Transaction::new(
            sequence,
            Instrument::equity(symbol),
            TransactionAction::Buy,
            5.0,
            100.0,
            NaiveDate::from_ymd_opt(2022, 1, 15).unwrap(),
        )
    }

    #[test]
    fn test_in_memory_orders_by_sequence() {
        let mut repo = InMemoryRepository::new();
        repo.append(&txn(1, "TCS.NS")).unwrap();
        repo.append(&txn(0, "INFY.NS")).unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(loaded[0].instrument.symbol, "INFY.NS");
        assert_eq!(loaded[1].instrument.symbol, "TCS.NS");
    }

    #[cfg(feature = "rusqlite-support")]
    #[test]
    fn test_sqlite_round_trip() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let mut fund = txn(0, "INF179K01BB8");
        fund.instrument = Instrument::mutual_fund("INF179K01BB8").with_name("HDFC Top 100");
        let sell = Transaction::new(
            1,
            Instrument::mutual_fund("INF179K01BB8"),
            TransactionAction::Sell,
            2.0,
            90.5,
            NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(),
        );

        repo.append(&fund).unwrap();
        repo.append(&sell).unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(repo.count().unwrap(), 2);
        assert_eq!(loaded, vec![fund, sell]);
    }

    #[cfg(feature = "rusqlite-support")]
    #[test]
    fn test_sqlite_batch_is_atomic() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        repo.append(&txn(0, "A")).unwrap();

        // second row collides with the stored sequence 0
        let batch = vec![txn(1, "B"), txn(0, "C")];
        assert!(repo.append_all(&batch).is_err());
        assert_eq!(repo.count().unwrap(), 1);

        repo.append_all(&[txn(1, "B"), txn(2, "C")]).unwrap();
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[cfg(feature = "rusqlite-support")]
    #[test]
    fn test_sqlite_rejects_duplicate_sequence() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        repo.append(&txn(0, "A")).unwrap();
        assert!(repo.append(&txn(0, "B")).is_err());
        assert_eq!(repo.count().unwrap(), 1);
    }
}
