//! Durable transaction log: SQLite replay and CSV round trip

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use rusty_portfolio::finance::csv_io::{read_transactions_from_path, write_transactions_to_path};
use rusty_portfolio::prelude::*;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, m, d).unwrap()
}

fn record_trades<R: TransactionRepository>(portfolio: &mut Portfolio<R>) {
    let stock = Instrument::equity("RELIANCE.NS").with_name("Reliance Industries");
    let fund = Instrument::mutual_fund("INF209K01VL4");

    portfolio.buy(stock.clone(), 15.0, 2450.0, date(1, 16)).unwrap();
    portfolio.buy(fund.clone(), 750.0, 125.5, date(3, 15)).unwrap();
    portfolio.buy(stock.clone(), 5.0, 2650.0, date(4, 3)).unwrap();
    portfolio.sell(stock, 8.0, 2700.0, date(6, 1)).unwrap();
    portfolio.sell(fund, 750.0, 131.0, date(7, 3)).unwrap();
}

/// Positions and P&L match; transaction ids may differ
fn assert_same_book(a: &Ledger, b: &Ledger) {
    let summary = |ledger: &Ledger| -> Vec<(InstrumentKey, f64, f64, NaiveDate)> {
        ledger
            .positions()
            .iter()
            .map(|p| {
                (
                    p.instrument.key(),
                    p.quantity,
                    p.average_price(),
                    p.acquired_on(),
                )
            })
            .collect()
    };
    assert_eq!(summary(a), summary(b));
    assert_eq!(a.transaction_count(), b.transaction_count());
    assert_abs_diff_eq!(
        a.pnl_summary().realized_pnl,
        b.pnl_summary().realized_pnl,
        epsilon = 1e-9
    );
}

#[cfg(feature = "rusqlite-support")]
mod sqlite {
    use super::*;
    use rusty_portfolio::finance::SqliteRepository;

    #[test]
    fn test_reopen_replays_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.db");

        let original = {
            let mut portfolio = Portfolio::open(SqliteRepository::new(&path).unwrap()).unwrap();
            record_trades(&mut portfolio);
            portfolio.ledger().clone()
        };

        let reopened = Portfolio::open(SqliteRepository::new(&path).unwrap()).unwrap();
        assert_same_book(&original, reopened.ledger());
        assert_eq!(reopened.repository().count().unwrap(), 5);

        let position = reopened
            .ledger()
            .position(&Instrument::equity("RELIANCE.NS"))
            .unwrap();
        assert_abs_diff_eq!(position.quantity, 12.0);
        assert_abs_diff_eq!(position.average_price(), 2500.0);
        assert_eq!(position.instrument.display_name(), "Reliance Industries");
        assert_eq!(reopened.ledger().open_position_count(), 1);
    }

    #[test]
    fn test_rejected_trade_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.db");

        {
            let mut portfolio = Portfolio::open(SqliteRepository::new(&path).unwrap()).unwrap();
            record_trades(&mut portfolio);
            assert!(portfolio
                .sell(Instrument::equity("RELIANCE.NS"), 100.0, 2700.0, date(8, 1))
                .is_err());
        }

        let reopened = Portfolio::open(SqliteRepository::new(&path).unwrap()).unwrap();
        assert_eq!(reopened.ledger().transaction_count(), 5);
    }

    #[test]
    fn test_sequence_continues_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.db");

        {
            let mut portfolio = Portfolio::open(SqliteRepository::new(&path).unwrap()).unwrap();
            record_trades(&mut portfolio);
        }

        let mut reopened = Portfolio::open(SqliteRepository::new(&path).unwrap()).unwrap();
        let txn = reopened
            .buy(Instrument::equity("TCS.NS"), 1.0, 3500.0, date(9, 1))
            .unwrap();
        let last_sequence = reopened.ledger().transactions()[4].sequence;
        assert!(txn.sequence > last_sequence);
    }
}

#[test]
fn test_csv_export_import_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transactions.csv");

    let mut source = Portfolio::open(InMemoryRepository::new()).unwrap();
    record_trades(&mut source);
    write_transactions_to_path(&path, source.ledger().transactions()).unwrap();

    let records = read_transactions_from_path(&path).unwrap();
    assert_eq!(records.len(), 5);

    let mut target = Portfolio::open(InMemoryRepository::new()).unwrap();
    assert_eq!(target.import(&records).unwrap(), 5);
    assert_same_book(source.ledger(), target.ledger());
}
