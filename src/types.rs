//! Core types and constants

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar date of a trade or a daily observation
pub type TradeDate = NaiveDate;

/// Instrument identifier (ticker or fund code)
pub type Symbol = String;

/// Price / NAV per unit
pub type Price = f64;

/// Units held or traded
pub type Quantity = f64;

/// Money amount
pub type Cash = f64;

/// Closing price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: TradeDate,
    pub close: Price,
}

impl PricePoint {
    pub fn new(date: TradeDate, close: Price) -> Self {
        Self { date, close }
    }
}

/// Simple return for one trading date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyReturn {
    pub date: TradeDate,
    pub value: f64,
}

impl DailyReturn {
    pub fn new(date: TradeDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Simple daily returns `P_t / P_{t-1} - 1` from a date-ordered close series.
///
/// Observations following a non-positive close are skipped.
pub fn simple_returns(prices: &[PricePoint]) -> Vec<DailyReturn> {
    prices
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| DailyReturn::new(w[1].date, w[1].close / w[0].close - 1.0))
        .collect()
}
