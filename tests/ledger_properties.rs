//! Property tests for ledger and return-series invariants

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rusty_portfolio::prelude::*;
use rusty_portfolio::returns::cumulative_from_daily;

fn day(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset as i64)
}

fn buys() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.001f64..1_000.0, 0.01f64..10_000.0), 1..20)
}

proptest! {
    #[test]
    fn average_price_within_purchase_range(buys in buys()) {
        let mut ledger = Ledger::default();
        let stock = Instrument::equity("PROP.NS");
        for (i, (quantity, price)) in buys.iter().enumerate() {
            ledger.add(stock.clone(), *quantity, *price, day(i)).unwrap();
        }

        let position = ledger.position(&stock).unwrap();
        let lowest = buys.iter().map(|b| b.1).fold(f64::INFINITY, f64::min);
        let highest = buys.iter().map(|b| b.1).fold(f64::NEG_INFINITY, f64::max);
        let tolerance = 1e-9 * highest;

        prop_assert!(position.average_price() >= lowest - tolerance);
        prop_assert!(position.average_price() <= highest + tolerance);

        let units: f64 = buys.iter().map(|b| b.0).sum();
        prop_assert!((position.quantity - units).abs() <= 1e-9 * units.max(1.0));
    }

    #[test]
    fn sell_keeps_average_and_quantity_non_negative(
        buys in buys(),
        fraction in 0.0f64..1.0,
        sell_price in 0.0f64..10_000.0,
    ) {
        let mut ledger = Ledger::default();
        let stock = Instrument::equity("PROP.NS");
        for (i, (quantity, price)) in buys.iter().enumerate() {
            ledger.add(stock.clone(), *quantity, *price, day(i)).unwrap();
        }
        let before = ledger.position(&stock).unwrap().clone();

        let sell = before.quantity * fraction;
        prop_assume!(sell > 0.0);
        ledger.remove(&stock, sell, sell_price, day(buys.len())).unwrap();

        match ledger.position(&stock) {
            Some(after) => {
                prop_assert!(after.quantity >= 0.0);
                prop_assert_eq!(after.average_price(), before.average_price());
                prop_assert_eq!(after.acquired_on(), before.acquired_on());
            }
            None => prop_assert!((before.quantity - sell).abs() <= 1e-10),
        }
    }

    #[test]
    fn oversell_changes_nothing(buys in buys(), excess in 0.001f64..100.0) {
        let mut ledger = Ledger::default();
        let stock = Instrument::equity("PROP.NS");
        for (i, (quantity, price)) in buys.iter().enumerate() {
            ledger.add(stock.clone(), *quantity, *price, day(i)).unwrap();
        }
        let before = ledger.position(&stock).unwrap().clone();
        let count = ledger.transaction_count();

        let result = ledger.remove(&stock, before.quantity + excess, 1.0, day(buys.len()));
        prop_assert!(result.is_err());
        prop_assert_eq!(ledger.position(&stock).unwrap(), &before);
        prop_assert_eq!(ledger.transaction_count(), count);
    }

    #[test]
    fn cumulative_series_recovers_daily_returns(
        returns in prop::collection::vec(-0.05f64..0.05, 1..300),
    ) {
        let cumulative = cumulative_from_daily(&returns);
        prop_assert_eq!(cumulative.len(), returns.len());
        prop_assert!((cumulative[0] - returns[0]).abs() < 1e-12);

        for i in 1..returns.len() {
            let recovered = (1.0 + cumulative[i]) / (1.0 + cumulative[i - 1]) - 1.0;
            prop_assert!((recovered - returns[i]).abs() < 1e-9);
        }
    }
}
