//! Deterministic synthetic NAV provider
//!
//! Stands in for a real NAV-history feed. Each instrument gets a seeded
//! Gaussian random walk over business days, so the same code always yields
//! the same series for a given `as_of` date. A walk can be anchored so it
//! passes through a known price on a known date, normally the first
//! purchase of a held position.

use crate::data::quotes::{Period, QuoteProvider};
use crate::error::{PortfolioError, Result};
use crate::finance::Ledger;
use crate::instrument::{AssetClass, Instrument, InstrumentKey};
use crate::types::{Price, PricePoint, TradeDate};
use chrono::{Datelike, Weekday};
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Starting NAV of every synthetic series
pub const DEFAULT_BASE_NAV: Price = 50.0;

/// Daily return distribution of a synthetic series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnProfile {
    pub mean: f64,
    pub std_dev: f64,
}

impl ReturnProfile {
    /// ~12% annualized, high volatility
    pub const EQUITY_LIKE: ReturnProfile = ReturnProfile {
        mean: 0.00035,
        std_dev: 0.008,
    };

    /// ~7% annualized, low volatility
    pub const DEBT_LIKE: ReturnProfile = ReturnProfile {
        mean: 0.00020,
        std_dev: 0.003,
    };

    /// Equities, and fund codes mentioning EQUITY or GROWTH, are equity-like
    pub fn for_instrument(instrument: &Instrument) -> Self {
        let code = instrument.symbol.to_ascii_uppercase();
        match instrument.asset_class {
            AssetClass::Equity => Self::EQUITY_LIKE,
            AssetClass::MutualFund if code.contains("EQUITY") || code.contains("GROWTH") => {
                Self::EQUITY_LIKE
            }
            AssetClass::MutualFund => Self::DEBT_LIKE,
        }
    }
}

/// Stable 64-bit FNV-1a hash
pub fn fnv1a(input: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    input.bytes().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

pub fn is_business_day(date: TradeDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Price a synthetic walk must pass through
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavAnchor {
    pub date: TradeDate,
    pub price: Price,
}

/// Seeded random-walk quotes ending at `as_of`
#[derive(Debug, Clone)]
pub struct DeterministicSyntheticProvider {
    as_of: TradeDate,
    base_navs: HashMap<String, Price>,
    anchors: HashMap<InstrumentKey, NavAnchor>,
}

impl DeterministicSyntheticProvider {
    pub fn new(as_of: TradeDate) -> Self {
        Self {
            as_of,
            base_navs: HashMap::new(),
            anchors: HashMap::new(),
        }
    }

    /// Provider whose walk for every open position passes through the price
    /// paid on the day the position was first bought
    pub fn anchored_to(as_of: TradeDate, ledger: &Ledger) -> Self {
        ledger
            .positions()
            .into_iter()
            .fold(Self::new(as_of), |provider, position| {
                let acquired_on = position.acquired_on();
                let first_price = ledger
                    .transactions_for(&position.instrument.key())
                    .into_iter()
                    .find(|txn| txn.is_buy() && txn.date == acquired_on)
                    .map_or(position.average_price(), |txn| txn.price);
                provider.with_anchor(&position.instrument, acquired_on, first_price)
            })
    }

    /// Scale the walk of one instrument so its close on `date` (or the last
    /// business day before it) equals `price`
    pub fn with_anchor(mut self, instrument: &Instrument, date: TradeDate, price: Price) -> Self {
        self.anchors
            .insert(instrument.key(), NavAnchor { date, price });
        self
    }

    pub fn anchor(&self, instrument: &Instrument) -> Option<NavAnchor> {
        self.anchors.get(&instrument.key()).copied()
    }

    /// Override the starting NAV for one code
    pub fn with_base_nav(mut self, symbol: impl Into<String>, nav: Price) -> Self {
        self.base_navs.insert(symbol.into(), nav);
        self
    }

    pub fn as_of(&self) -> TradeDate {
        self.as_of
    }

    /// Full five-year series; shorter periods are its tail so all periods agree
    fn series(&self, instrument: &Instrument) -> Result<Vec<PricePoint>> {
        let profile = ReturnProfile::for_instrument(instrument);
        let normal = Normal::new(profile.mean, profile.std_dev).map_err(|e| {
            PortfolioError::DataError(format!("Invalid return profile for {}: {}", instrument.symbol, e))
        })?;
        let mut rng = StdRng::seed_from_u64(fnv1a(&instrument.symbol));

        let start = self.as_of - Period::FiveYears.duration();
        let base = self
            .base_navs
            .get(&instrument.symbol)
            .copied()
            .unwrap_or(DEFAULT_BASE_NAV);
        let mut nav = base;

        let mut series: Vec<PricePoint> = start
            .iter_days()
            .take_while(|date| *date <= self.as_of)
            .filter(|date| is_business_day(*date))
            .map(|date| {
                nav *= 1.0 + normal.sample(&mut rng);
                PricePoint::new(date, nav)
            })
            .collect();

        if let Some(anchor) = self.anchor(instrument) {
            // anchors before the window scale from the starting NAV
            let reference = series
                .iter()
                .rev()
                .find(|p| p.date <= anchor.date)
                .map_or(base, |p| p.close);
            let scale = anchor.price / reference;
            for point in &mut series {
                point.close *= scale;
            }
        }

        log::debug!(
            "Generated {} synthetic closes for {} ({:?})",
            series.len(),
            instrument.symbol,
            profile
        );
        Ok(series)
    }
}

impl QuoteProvider for DeterministicSyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        self.series(instrument)?
            .last()
            .map(|p| p.close)
            .ok_or_else(|| PortfolioError::quote_unavailable(&instrument.symbol, "empty synthetic series"))
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        let start = self.as_of - period.duration();
        Ok(self
            .series(instrument)?
            .into_iter()
            .filter(|p| p.date >= start)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn provider() -> DeterministicSyntheticProvider {
        DeterministicSyntheticProvider::new(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap())
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_same_code_same_series() {
        let fund = Instrument::mutual_fund("INF179K01BB8");
        let a = provider().price_history(&fund, Period::OneYear).unwrap();
        let b = provider().price_history(&fund, Period::OneYear).unwrap();
        assert_eq!(a, b);

        let other = provider()
            .price_history(&Instrument::mutual_fund("INF209K01VL4"), Period::OneYear)
            .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_business_days_only() {
        let fund = Instrument::mutual_fund("INF179K01BB8");
        let history = provider().price_history(&fund, Period::OneMonth).unwrap();

        assert!(!history.is_empty());
        assert!(history.iter().all(|p| is_business_day(p.date)));
        assert!(history.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(history.last().unwrap().date, provider().as_of());
    }

    #[test]
    fn test_periods_agree_and_current_is_last_close() {
        let fund = Instrument::mutual_fund("INF090I01KJ8");
        let year = provider().price_history(&fund, Period::OneYear).unwrap();
        let month = provider().price_history(&fund, Period::OneMonth).unwrap();

        assert_eq!(&year[year.len() - month.len()..], month.as_slice());
        assert_eq!(
            provider().current_price(&fund).unwrap(),
            year.last().unwrap().close
        );
    }

    #[test]
    fn test_profiles() {
        assert_eq!(
            ReturnProfile::for_instrument(&Instrument::mutual_fund("INF090I01KJ8")),
            ReturnProfile::DEBT_LIKE
        );
        assert_eq!(
            ReturnProfile::for_instrument(&Instrument::mutual_fund("XYZ-GROWTH")),
            ReturnProfile::EQUITY_LIKE
        );
        assert_eq!(
            ReturnProfile::for_instrument(&Instrument::equity("TCS.NS")),
            ReturnProfile::EQUITY_LIKE
        );
    }

    #[test]
    fn test_anchor_passes_through_price() {
        let stock = Instrument::equity("RELIANCE.NS");
        let bought = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        let provider = provider().with_anchor(&stock, bought, 2450.0);

        let history = provider.price_history(&stock, Period::TwoYears).unwrap();
        let on_purchase = history.iter().find(|p| p.date == bought).unwrap();
        assert!((on_purchase.close - 2450.0).abs() < 1e-9);

        // the walk keeps its shape, only the level moves
        let plain = provider_history(&stock);
        let ratio = history[0].close / plain[plain.len() - history.len()].close;
        assert!(history
            .iter()
            .zip(&plain[plain.len() - history.len()..])
            .all(|(a, b)| (a.close / b.close - ratio).abs() < 1e-9));
    }

    fn provider_history(instrument: &Instrument) -> Vec<PricePoint> {
        provider().price_history(instrument, Period::FiveYears).unwrap()
    }

    #[test]
    fn test_weekend_anchor_uses_prior_business_day() {
        let stock = Instrument::equity("TCS.NS");
        let saturday = NaiveDate::from_ymd_opt(2023, 6, 17).unwrap();
        let friday = NaiveDate::from_ymd_opt(2023, 6, 16).unwrap();
        let provider = provider().with_anchor(&stock, saturday, 3500.0);

        let history = provider.price_history(&stock, Period::TwoYears).unwrap();
        let close = history.iter().find(|p| p.date == friday).unwrap().close;
        assert!((close - 3500.0).abs() < 1e-9);
    }

    #[test]
    fn test_anchored_to_ledger_prices_new_position_at_cost() {
        let as_of = provider().as_of();
        let stock = Instrument::equity("INFY.NS");
        let fund = Instrument::mutual_fund("INF204KB14M2");

        let mut ledger = Ledger::default();
        ledger.add(stock.clone(), 20.0, 1800.0, as_of).unwrap();
        ledger.add(stock.clone(), 10.0, 1900.0, as_of).unwrap();
        ledger.add(fund.clone(), 1200.0, 150.25, as_of).unwrap();

        let provider = DeterministicSyntheticProvider::anchored_to(as_of, &ledger);
        assert_eq!(
            provider.anchor(&stock),
            Some(NavAnchor {
                date: as_of,
                price: 1800.0
            })
        );
        assert!((provider.current_price(&stock).unwrap() - 1800.0).abs() < 1e-9);
        assert!((provider.current_price(&fund).unwrap() - 150.25).abs() < 1e-9);

        // an equity and a fund sharing a code anchor separately
        assert_eq!(provider.anchor(&Instrument::mutual_fund("INFY.NS")), None);
    }

    #[test]
    fn test_base_nav_override() {
        let fund = Instrument::mutual_fund("INF179K01BB8");
        let low = provider().current_price(&fund).unwrap();
        let high = provider()
            .with_base_nav("INF179K01BB8", 100.0)
            .current_price(&fund)
            .unwrap();
        assert!((high / low - 2.0).abs() < 1e-9);
    }
}
