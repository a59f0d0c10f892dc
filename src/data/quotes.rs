//! Quote Provider seam
//!
//! Valuation and the returns builder only ever see [`QuoteProvider`]; live
//! feeds, synthetic NAV series, retries and caching all live behind it.

use crate::error::{PortfolioError, Result};
use crate::instrument::{AssetClass, Instrument, InstrumentKey};
use crate::types::{Price, PricePoint};
use chrono::Duration;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Lookback period for historical prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    /// Calendar days covered by the period
    pub fn days(&self) -> i64 {
        match self {
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::SixMonths => 180,
            Period::OneYear => 365,
            Period::TwoYears => 730,
            Period::FiveYears => 1825,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::days(self.days())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }

    pub fn all() -> [Period; 6] {
        [
            Period::OneMonth,
            Period::ThreeMonths,
            Period::SixMonths,
            Period::OneYear,
            Period::TwoYears,
            Period::FiveYears,
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        Period::all()
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PortfolioError::ParseError(format!("Unknown period '{}'", s)))
    }
}

/// Source of current and historical prices
pub trait QuoteProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Current price (or NAV) per unit
    fn current_price(&self, instrument: &Instrument) -> Result<Price>;

    /// Date-ordered closing prices covering `period`
    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>>;

    /// Batch lookup of current prices, one result per instrument in order
    fn current_prices(&self, instruments: &[Instrument]) -> Vec<Result<Price>> {
        instruments.iter().map(|i| self.current_price(i)).collect()
    }
}

impl<P: QuoteProvider + ?Sized> QuoteProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        (**self).current_price(instrument)
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        (**self).price_history(instrument, period)
    }

    fn current_prices(&self, instruments: &[Instrument]) -> Vec<Result<Price>> {
        (**self).current_prices(instruments)
    }
}

impl<P: QuoteProvider + ?Sized> QuoteProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        (**self).current_price(instrument)
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        (**self).price_history(instrument, period)
    }

    fn current_prices(&self, instruments: &[Instrument]) -> Vec<Result<Price>> {
        (**self).current_prices(instruments)
    }
}

/// Keep the points within `period` of the last observation
pub fn trim_to_period(history: &[PricePoint], period: Period) -> Vec<PricePoint> {
    let Some(last) = history.last() else {
        return Vec::new();
    };
    let start = last.date - period.duration();
    history.iter().filter(|p| p.date >= start).copied().collect()
}

/// Explicitly loaded prices and histories
#[derive(Debug, Clone, Default)]
pub struct InMemoryQuoteProvider {
    prices: HashMap<InstrumentKey, Price>,
    histories: HashMap<InstrumentKey, Vec<PricePoint>>,
}

impl InMemoryQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, instrument: &Instrument, price: Price) -> Self {
        self.set_price(instrument, price);
        self
    }

    pub fn with_history(mut self, instrument: &Instrument, history: Vec<PricePoint>) -> Self {
        self.set_history(instrument, history);
        self
    }

    pub fn set_price(&mut self, instrument: &Instrument, price: Price) {
        self.prices.insert(instrument.key(), price);
    }

    /// Store a history, sorted by date
    pub fn set_history(&mut self, instrument: &Instrument, mut history: Vec<PricePoint>) {
        history.sort_by_key(|p| p.date);
        self.histories.insert(instrument.key(), history);
    }
}

impl QuoteProvider for InMemoryQuoteProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    /// Explicit price, else the last close of the stored history
    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        let key = instrument.key();
        self.prices
            .get(&key)
            .copied()
            .or_else(|| {
                self.histories
                    .get(&key)
                    .and_then(|h| h.last())
                    .map(|p| p.close)
            })
            .ok_or_else(|| PortfolioError::quote_unavailable(&instrument.symbol, "no price loaded"))
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        self.histories
            .get(&instrument.key())
            .filter(|h| !h.is_empty())
            .map(|h| trim_to_period(h, period))
            .ok_or_else(|| {
                PortfolioError::quote_unavailable(&instrument.symbol, "no history loaded")
            })
    }
}

/// Routes equities and mutual funds to separate providers
pub struct AssetClassRouter {
    equities: Box<dyn QuoteProvider>,
    mutual_funds: Box<dyn QuoteProvider>,
}

impl AssetClassRouter {
    pub fn new(equities: Box<dyn QuoteProvider>, mutual_funds: Box<dyn QuoteProvider>) -> Self {
        Self {
            equities,
            mutual_funds,
        }
    }

    fn route(&self, asset_class: AssetClass) -> &dyn QuoteProvider {
        match asset_class {
            AssetClass::Equity => self.equities.as_ref(),
            AssetClass::MutualFund => self.mutual_funds.as_ref(),
        }
    }
}

impl QuoteProvider for AssetClassRouter {
    fn name(&self) -> &str {
        "router"
    }

    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        self.route(instrument.asset_class).current_price(instrument)
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        self.route(instrument.asset_class)
            .price_history(instrument, period)
    }

    /// One batch call per underlying provider, results put back in input order
    fn current_prices(&self, instruments: &[Instrument]) -> Vec<Result<Price>> {
        let mut results: Vec<Option<Result<Price>>> = instruments.iter().map(|_| None).collect();

        for asset_class in [AssetClass::Equity, AssetClass::MutualFund] {
            let (indices, batch): (Vec<usize>, Vec<Instrument>) = instruments
                .iter()
                .enumerate()
                .filter(|(_, i)| i.asset_class == asset_class)
                .map(|(idx, i)| (idx, i.clone()))
                .unzip();
            if batch.is_empty() {
                continue;
            }

            let prices = self.route(asset_class).current_prices(&batch);
            for (idx, price) in indices.into_iter().zip(prices) {
                results[idx] = Some(price);
            }
        }

        results
            .into_iter()
            .zip(instruments)
            .map(|(result, instrument)| {
                result.unwrap_or_else(|| {
                    Err(PortfolioError::quote_unavailable(
                        &instrument.symbol,
                        "provider returned no result",
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("1y".parse::<Period>().unwrap(), Period::OneYear);
        assert_eq!("6MO".parse::<Period>().unwrap(), Period::SixMonths);
        assert!("7d".parse::<Period>().is_err());
        assert_eq!(Period::ThreeMonths.days(), 90);
        assert_eq!(Period::default(), Period::OneYear);
    }

    #[test]
    fn test_in_memory_current_price() {
        let tcs = Instrument::equity("TCS.NS");
        let provider = InMemoryQuoteProvider::new().with_price(&tcs, 3600.0);

        assert_eq!(provider.current_price(&tcs).unwrap(), 3600.0);
        let err = provider
            .current_price(&Instrument::equity("INFY.NS"))
            .unwrap_err();
        assert!(matches!(err, PortfolioError::QuoteUnavailable { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_in_memory_falls_back_to_last_close() {
        let tcs = Instrument::equity("TCS.NS");
        let provider = InMemoryQuoteProvider::new().with_history(
            &tcs,
            vec![
                PricePoint::new(day(1, 3), 100.0),
                PricePoint::new(day(1, 2), 99.0),
            ],
        );
        assert_eq!(provider.current_price(&tcs).unwrap(), 100.0);
    }

    #[test]
    fn test_history_trimmed_to_period() {
        let tcs = Instrument::equity("TCS.NS");
        let provider = InMemoryQuoteProvider::new().with_history(
            &tcs,
            vec![
                PricePoint::new(day(1, 2), 100.0),
                PricePoint::new(day(3, 1), 101.0),
                PricePoint::new(day(3, 20), 102.0),
            ],
        );

        let history = provider.price_history(&tcs, Period::OneMonth).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, day(3, 1));
    }

    #[test]
    fn test_router_batches_by_class() {
        let stock = Instrument::equity("TCS.NS");
        let fund = Instrument::mutual_fund("INF179K01BB8");
        let router = AssetClassRouter::new(
            Box::new(InMemoryQuoteProvider::new().with_price(&stock, 10.0)),
            Box::new(InMemoryQuoteProvider::new().with_price(&fund, 20.0)),
        );

        let prices = router.current_prices(&[fund.clone(), stock.clone()]);
        assert_eq!(prices[0].as_ref().unwrap(), &20.0);
        assert_eq!(prices[1].as_ref().unwrap(), &10.0);

        // fund code is not visible to the equity provider
        assert!(router
            .current_price(&Instrument::equity("INF179K01BB8"))
            .is_err());
    }
}
