//! Returns Time-Series Builder
//!
//! Blends per-instrument simple daily returns into one portfolio series
//! using static cost-basis weights over the whole book. Weights are not
//! rebalanced as prices drift.
//!
//! The series covers the common window `[max start, min end]` of every
//! instrument whose history could be fetched. Inside the window an
//! instrument without a return on some date contributes 0 for that date.

use crate::data::quotes::{Period, QuoteProvider};
use crate::finance::Ledger;
use crate::instrument::Instrument;
use crate::types::{simple_returns, DailyReturn, TradeDate};
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// One date of the portfolio series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnPoint {
    pub date: TradeDate,
    pub daily: f64,
    pub cumulative: f64,
}

/// Static cost weight of one instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentWeight {
    pub instrument: Instrument,
    pub weight: f64,
}

/// Returns of one instrument aligned to the portfolio dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentReturns {
    pub instrument: Instrument,
    pub returns: Vec<f64>,
}

/// Instrument left out of the series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedInstrument {
    pub instrument: Instrument,
    pub reason: String,
}

/// Weighted portfolio daily-return series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub period: Period,
    pub points: Vec<ReturnPoint>,
    pub weights: Vec<InstrumentWeight>,
    pub instrument_returns: Vec<InstrumentReturns>,
    pub excluded: Vec<ExcludedInstrument>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<TradeDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn daily_returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.daily).collect()
    }

    pub fn cumulative_returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.cumulative).collect()
    }

    /// Dated daily returns, for benchmark alignment
    pub fn as_daily_returns(&self) -> Vec<DailyReturn> {
        self.points
            .iter()
            .map(|p| DailyReturn::new(p.date, p.daily))
            .collect()
    }

    pub fn start(&self) -> Option<TradeDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn end(&self) -> Option<TradeDate> {
        self.points.last().map(|p| p.date)
    }
}

/// `Π(1+r) - 1` at every point of `returns`
pub fn cumulative_from_daily(returns: &[f64]) -> Vec<f64> {
    let mut wealth = 1.0;
    returns
        .iter()
        .map(|r| {
            wealth *= 1.0 + r;
            wealth - 1.0
        })
        .collect()
}

/// Build the portfolio return series for `period`.
///
/// Histories are fetched concurrently; an instrument whose history fails or
/// yields no returns is listed in `excluded` and skipped.
pub fn build_return_series(
    ledger: &Ledger,
    provider: &dyn QuoteProvider,
    period: Period,
) -> ReturnSeries {
    let positions = ledger.positions();
    let mut series = ReturnSeries {
        period,
        ..Default::default()
    };
    if positions.is_empty() {
        return series;
    }

    let total_cost = ledger.total_cost();
    series.weights = positions
        .iter()
        .map(|p| InstrumentWeight {
            instrument: p.instrument.clone(),
            weight: if total_cost > 0.0 {
                p.cost_basis() / total_cost
            } else {
                0.0
            },
        })
        .collect();

    let histories: Vec<_> = positions
        .par_iter()
        .map(|p| provider.price_history(&p.instrument, period))
        .collect();

    let mut included: Vec<(InstrumentWeight, HashMap<TradeDate, f64>)> = Vec::new();
    let mut start: Option<TradeDate> = None;
    let mut end: Option<TradeDate> = None;

    for (weight, history) in series.weights.iter().zip(histories) {
        let returns = match history {
            Ok(prices) => simple_returns(&prices),
            Err(e) => {
                log::warn!("Excluding {} from returns: {}", weight.instrument.symbol, e);
                series.excluded.push(ExcludedInstrument {
                    instrument: weight.instrument.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let (Some(first), Some(last)) = (returns.first(), returns.last()) else {
            log::warn!("Excluding {} from returns: too few prices", weight.instrument.symbol);
            series.excluded.push(ExcludedInstrument {
                instrument: weight.instrument.clone(),
                reason: "fewer than two prices in period".to_string(),
            });
            continue;
        };

        start = Some(start.map_or(first.date, |s| s.max(first.date)));
        end = Some(end.map_or(last.date, |e| e.min(last.date)));
        included.push((weight.clone(), returns.iter().map(|r| (r.date, r.value)).collect()));
    }

    let (Some(start), Some(end)) = (start, end) else {
        return series;
    };
    if start > end {
        log::warn!("Return histories do not overlap ({} > {})", start, end);
        return series;
    }
    log::debug!(
        "Common return window {} to {} across {} instruments",
        start,
        end,
        included.len()
    );

    let dates: BTreeSet<TradeDate> = included
        .iter()
        .flat_map(|(_, returns)| returns.keys().copied())
        .filter(|d| *d >= start && *d <= end)
        .collect();

    series.instrument_returns = included
        .iter()
        .map(|(weight, returns)| InstrumentReturns {
            instrument: weight.instrument.clone(),
            returns: dates
                .iter()
                .map(|d| returns.get(d).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    let daily: Vec<f64> = (0..dates.len())
        .map(|i| {
            included
                .iter()
                .zip(&series.instrument_returns)
                .map(|((weight, _), aligned)| weight.weight * aligned.returns[i])
                .sum()
        })
        .collect();

    series.points = dates
        .into_iter()
        .zip(daily.iter().copied())
        .zip(cumulative_from_daily(&daily))
        .map(|((date, daily), cumulative)| ReturnPoint {
            date,
            daily,
            cumulative,
        })
        .collect();

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::quotes::InMemoryQuoteProvider;
    use crate::types::PricePoint;
    use chrono::NaiveDate;

    fn day(d: u32) -> TradeDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn prices(closes: &[(u32, f64)]) -> Vec<PricePoint> {
        closes.iter().map(|&(d, c)| PricePoint::new(day(d), c)).collect()
    }

    #[test]
    fn test_weighted_daily_return() {
        let a = Instrument::equity("A");
        let b = Instrument::equity("B");
        let mut ledger = Ledger::default();
        ledger.add(a.clone(), 6.0, 100.0, day(1)).unwrap();
        ledger.add(b.clone(), 4.0, 100.0, day(1)).unwrap();

        let provider = InMemoryQuoteProvider::new()
            .with_history(&a, prices(&[(1, 100.0), (2, 102.0)]))
            .with_history(&b, prices(&[(1, 100.0), (2, 99.0)]));

        let series = build_return_series(&ledger, &provider, Period::OneYear);
        assert_eq!(series.len(), 1);
        assert!((series.points[0].daily - 0.008).abs() < 1e-12);
        assert!((series.weights[0].weight - 0.6).abs() < 1e-12);
        assert!((series.weights[1].weight - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_common_window() {
        let a = Instrument::equity("A");
        let b = Instrument::equity("B");
        let mut ledger = Ledger::default();
        ledger.add(a.clone(), 1.0, 100.0, day(1)).unwrap();
        ledger.add(b.clone(), 1.0, 100.0, day(1)).unwrap();

        let provider = InMemoryQuoteProvider::new()
            .with_history(
                &a,
                prices(&[(1, 100.0), (2, 101.0), (3, 102.0), (4, 103.0), (5, 104.0)]),
            )
            .with_history(&b, prices(&[(2, 50.0), (3, 51.0), (4, 52.0)]));

        let series = build_return_series(&ledger, &provider, Period::OneYear);
        assert_eq!(series.dates(), vec![day(3), day(4)]);
        assert_eq!(series.instrument_returns.len(), 2);
        assert!(series.excluded.is_empty());
    }

    #[test]
    fn test_missing_date_contributes_zero() {
        let a = Instrument::equity("A");
        let b = Instrument::equity("B");
        let mut ledger = Ledger::default();
        ledger.add(a.clone(), 1.0, 100.0, day(1)).unwrap();
        ledger.add(b.clone(), 1.0, 100.0, day(1)).unwrap();

        // B has no close on the 3rd
        let provider = InMemoryQuoteProvider::new()
            .with_history(&a, prices(&[(1, 100.0), (2, 110.0), (3, 121.0), (4, 121.0)]))
            .with_history(&b, prices(&[(1, 100.0), (2, 100.0), (4, 100.0)]));

        let series = build_return_series(&ledger, &provider, Period::OneYear);
        assert_eq!(series.dates(), vec![day(2), day(3), day(4)]);
        assert!((series.points[1].daily - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_failed_history_excluded() {
        let a = Instrument::equity("A");
        let mut ledger = Ledger::default();
        ledger.add(a.clone(), 1.0, 100.0, day(1)).unwrap();
        ledger
            .add(Instrument::equity("GONE"), 1.0, 100.0, day(1))
            .unwrap();

        let provider =
            InMemoryQuoteProvider::new().with_history(&a, prices(&[(1, 100.0), (2, 110.0)]));

        let series = build_return_series(&ledger, &provider, Period::OneYear);
        assert_eq!(series.excluded.len(), 1);
        assert_eq!(series.excluded[0].instrument.symbol, "GONE");
        // weights stay over the whole book
        assert!((series.points[0].daily - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_no_overlap_is_empty() {
        let a = Instrument::equity("A");
        let b = Instrument::equity("B");
        let mut ledger = Ledger::default();
        ledger.add(a.clone(), 1.0, 100.0, day(1)).unwrap();
        ledger.add(b.clone(), 1.0, 100.0, day(1)).unwrap();

        let provider = InMemoryQuoteProvider::new()
            .with_history(&a, prices(&[(1, 100.0), (2, 101.0)]))
            .with_history(&b, prices(&[(8, 100.0), (9, 101.0)]));

        assert!(build_return_series(&ledger, &provider, Period::OneYear).is_empty());
    }

    #[test]
    fn test_empty_ledger() {
        let series =
            build_return_series(&Ledger::default(), &InMemoryQuoteProvider::new(), Period::OneYear);
        assert!(series.is_empty());
        assert!(series.weights.is_empty());
    }

    #[test]
    fn test_cumulative_round_trip() {
        let a = Instrument::equity("A");
        let mut ledger = Ledger::default();
        ledger.add(a.clone(), 1.0, 100.0, day(1)).unwrap();
        let provider = InMemoryQuoteProvider::new().with_history(
            &a,
            prices(&[(1, 100.0), (2, 103.0), (3, 99.0), (4, 105.0), (5, 104.0)]),
        );

        let series = build_return_series(&ledger, &provider, Period::OneYear);
        let rebuilt = cumulative_from_daily(&series.daily_returns());
        for (a, b) in rebuilt.iter().zip(series.cumulative_returns()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((series.points.last().unwrap().cumulative - 0.04).abs() < 1e-12);
    }
}
