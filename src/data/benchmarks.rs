//! Benchmark return data for relative performance metrics
//!
//! Provides benchmark return series for calculating alpha, beta, and the
//! information ratio against a reference index (e.g., S&P 500).

use crate::data::quotes::{Period, QuoteProvider};
use crate::data::synthetic::is_business_day;
use crate::error::Result;
use crate::finance::constants::TRADING_DAYS_PER_YEAR;
use crate::instrument::Instrument;
use crate::types::{simple_returns, DailyReturn, TradeDate};
use hashbrown::HashMap;
use std::sync::Arc;

/// Default benchmark index (S&P 500)
pub const DEFAULT_BENCHMARK_SYMBOL: &str = "^GSPC";

/// Trait for reading benchmark return data
pub trait BenchmarkProvider: Send + Sync {
    /// Date-ordered daily benchmark returns covering `period`
    fn benchmark_returns(&self, period: Period) -> Result<Vec<DailyReturn>>;

    /// Cumulative benchmark return over period
    fn cumulative_return(&self, period: Period) -> Result<f64> {
        Ok(calculate_cumulative_return(&self.benchmark_returns(period)?))
    }
}

/// Index benchmark derived from a quote provider's price history
pub struct QuoteBenchmark {
    provider: Arc<dyn QuoteProvider>,
    index: Instrument,
}

impl QuoteBenchmark {
    pub fn new(provider: Arc<dyn QuoteProvider>, symbol: impl Into<String>) -> Self {
        Self {
            provider,
            index: Instrument::equity(symbol).with_name("Benchmark index"),
        }
    }

    /// S&P 500 benchmark
    pub fn sp500(provider: Arc<dyn QuoteProvider>) -> Self {
        Self::new(provider, DEFAULT_BENCHMARK_SYMBOL)
    }

    pub fn symbol(&self) -> &str {
        &self.index.symbol
    }
}

impl BenchmarkProvider for QuoteBenchmark {
    fn benchmark_returns(&self, period: Period) -> Result<Vec<DailyReturn>> {
        let history = self.provider.price_history(&self.index, period)?;
        let returns = simple_returns(&history);
        log::debug!(
            "Benchmark {} returned {} observations for {}",
            self.index.symbol,
            returns.len(),
            period
        );
        Ok(returns)
    }
}

/// Preloaded benchmark returns
#[derive(Debug, Clone, Default)]
pub struct StaticBenchmark {
    returns: Vec<DailyReturn>,
}

impl StaticBenchmark {
    pub fn new(mut returns: Vec<DailyReturn>) -> Self {
        returns.sort_by_key(|r| r.date);
        Self { returns }
    }
}

impl BenchmarkProvider for StaticBenchmark {
    /// Returns within `period` of the last observation
    fn benchmark_returns(&self, period: Period) -> Result<Vec<DailyReturn>> {
        let Some(last) = self.returns.last() else {
            return Ok(Vec::new());
        };
        let start = last.date - period.duration();
        Ok(self
            .returns
            .iter()
            .filter(|r| r.date >= start)
            .copied()
            .collect())
    }
}

/// Constant benchmark - fixed return rate on every business day (for testing)
#[derive(Debug, Clone)]
pub struct ConstantBenchmark {
    /// Daily return rate
    daily_return: f64,
    as_of: TradeDate,
}

impl ConstantBenchmark {
    /// Create constant benchmark with daily return rate
    pub fn new(daily_return: f64, as_of: TradeDate) -> Self {
        Self {
            daily_return,
            as_of,
        }
    }

    /// Create from annualized return rate
    pub fn from_annualized(annual_return: f64, as_of: TradeDate) -> Self {
        let daily_return = (1.0 + annual_return).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0;
        Self::new(daily_return, as_of)
    }

    pub fn daily_return(&self) -> f64 {
        self.daily_return
    }
}

impl BenchmarkProvider for ConstantBenchmark {
    fn benchmark_returns(&self, period: Period) -> Result<Vec<DailyReturn>> {
        let start = self.as_of - period.duration();
        Ok(start
            .iter_days()
            .take_while(|date| *date <= self.as_of)
            .filter(|date| is_business_day(*date))
            .map(|date| DailyReturn::new(date, self.daily_return))
            .collect())
    }
}

/// Portfolio and benchmark returns matched by date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedReturns {
    pub dates: Vec<TradeDate>,
    pub portfolio: Vec<f64>,
    pub benchmark: Vec<f64>,
}

impl AlignedReturns {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Inner join of portfolio returns onto benchmark dates
pub fn align_with_benchmark(portfolio: &[DailyReturn], benchmark: &[DailyReturn]) -> AlignedReturns {
    let by_date: HashMap<TradeDate, f64> = benchmark.iter().map(|r| (r.date, r.value)).collect();

    let mut aligned = AlignedReturns::default();
    for point in portfolio {
        if let Some(&b) = by_date.get(&point.date) {
            aligned.dates.push(point.date);
            aligned.portfolio.push(point.value);
            aligned.benchmark.push(b);
        }
    }

    if aligned.len() < portfolio.len() {
        log::debug!(
            "Benchmark alignment kept {} of {} portfolio observations",
            aligned.len(),
            portfolio.len()
        );
    }
    aligned
}

/// Calculate cumulative return from daily returns
pub fn calculate_cumulative_return(returns: &[DailyReturn]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r.value)) - 1.0
}
