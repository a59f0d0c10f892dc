//! Performance metrics over a daily return series
//!
//! Percent-valued fields (total/annualized return, volatility, max drawdown,
//! alpha) are reported ×100; ratios and beta are raw.

use crate::analytics::stats::{mean, sample_covariance, sample_std, sample_variance};
use crate::finance::constants::{
    MIN_PERFORMANCE_OBSERVATIONS, SORTINO_DOWNSIDE_FLOOR, TRADING_DAYS_PER_YEAR, ZERO_TOLERANCE,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Performance metrics for a return series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Total compounded return (%)
    pub total_return: f64,
    /// Annualized return (%)
    pub annualized_return: f64,
    /// Annualized volatility (%)
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Worst peak-to-trough decline (%, negative or 0)
    pub max_drawdown: f64,
    /// Annualized alpha against the benchmark (%)
    pub alpha: f64,
    pub beta: f64,
    pub information_ratio: f64,
}

/// Daily rate equivalent to an annual risk-free rate
pub fn daily_risk_free_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0
}

/// Π(1+r) - 1
pub fn total_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Compound the total return over a 252-day year
pub fn annualized_return(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    (1.0 + total_return(returns)).powf(TRADING_DAYS_PER_YEAR / returns.len() as f64) - 1.0
}

pub fn annualized_volatility(returns: &[f64]) -> f64 {
    sample_std(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < MIN_PERFORMANCE_OBSERVATIONS {
        return 0.0;
    }
    let rf_daily = daily_risk_free_rate(risk_free_rate);
    let excess: Vec<f64> = returns.iter().map(|r| r - rf_daily).collect();

    let std = sample_std(&excess);
    if std <= ZERO_TOLERANCE {
        return 0.0;
    }
    mean(&excess) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Sortino ratio; downside deviation is the RMS of negative excess returns
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < MIN_PERFORMANCE_OBSERVATIONS {
        return 0.0;
    }
    let rf_daily = daily_risk_free_rate(risk_free_rate);
    let excess: Vec<f64> = returns.iter().map(|r| r - rf_daily).collect();

    let negative_squares: Vec<f64> = excess
        .iter()
        .filter(|r| **r < 0.0)
        .map(|r| r * r)
        .collect();
    let downside = if negative_squares.is_empty() {
        SORTINO_DOWNSIDE_FLOOR
    } else {
        mean(&negative_squares).sqrt()
    };

    mean(&excess) / downside * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Most negative drawdown of the wealth index Π(1+r)
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut wealth = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;

    for r in returns {
        wealth *= 1.0 + r;
        peak = peak.max(wealth);
        if peak > 0.0 {
            worst = worst.min(wealth / peak - 1.0);
        }
    }
    worst
}

/// Daily (alpha, beta) from sample moments; alpha is annualized, beta is 0
/// when the benchmark has no variance
pub fn alpha_beta(returns: &[f64], benchmark: &[f64]) -> (f64, f64) {
    let n = returns.len().min(benchmark.len());
    if n < MIN_PERFORMANCE_OBSERVATIONS {
        return (0.0, 0.0);
    }
    let (returns, benchmark) = (&returns[..n], &benchmark[..n]);

    let variance = sample_variance(benchmark);
    let beta = if variance > ZERO_TOLERANCE {
        sample_covariance(returns, benchmark) / variance
    } else {
        0.0
    };
    let alpha = (mean(returns) - beta * mean(benchmark)) * TRADING_DAYS_PER_YEAR;
    (alpha, beta)
}

pub fn information_ratio(returns: &[f64], benchmark: &[f64]) -> f64 {
    let n = returns.len().min(benchmark.len());
    if n < MIN_PERFORMANCE_OBSERVATIONS {
        return 0.0;
    }
    let active: Vec<f64> = returns[..n]
        .iter()
        .zip(&benchmark[..n])
        .map(|(r, b)| r - b)
        .collect();

    let tracking_error = sample_std(&active);
    if tracking_error <= ZERO_TOLERANCE {
        return 0.0;
    }
    mean(&active) / tracking_error * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Calculate the full metric set.
///
/// Fewer than two observations yields all-zero metrics. Without a benchmark
/// alpha, beta and information ratio are 0.
pub fn calculate_performance_metrics(
    returns: &[f64],
    benchmark: Option<&[f64]>,
    risk_free_rate: f64,
) -> PerformanceMetrics {
    if returns.len() < MIN_PERFORMANCE_OBSERVATIONS {
        return PerformanceMetrics::default();
    }

    let (alpha, beta, information_ratio) = match benchmark {
        Some(b) => {
            let (alpha, beta) = alpha_beta(returns, b);
            (alpha, beta, information_ratio(returns, b))
        }
        None => (0.0, 0.0, 0.0),
    };

    PerformanceMetrics {
        total_return: total_return(returns) * 100.0,
        annualized_return: annualized_return(returns) * 100.0,
        volatility: annualized_volatility(returns) * 100.0,
        sharpe_ratio: sharpe_ratio(returns, risk_free_rate),
        sortino_ratio: sortino_ratio(returns, risk_free_rate),
        max_drawdown: max_drawdown(returns) * 100.0,
        alpha: alpha * 100.0,
        beta,
        information_ratio,
    }
}

impl fmt::Display for PerformanceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Performance Metrics:")?;
        writeln!(f, "  Total Return:       {:.2}%", self.total_return)?;
        writeln!(f, "  Annualized Return:  {:.2}%", self.annualized_return)?;
        writeln!(f, "  Volatility:         {:.2}%", self.volatility)?;
        writeln!(f, "  Sharpe Ratio:       {:.2}", self.sharpe_ratio)?;
        writeln!(f, "  Sortino Ratio:      {:.2}", self.sortino_ratio)?;
        writeln!(f, "  Max Drawdown:       {:.2}%", self.max_drawdown)?;
        writeln!(f, "  Alpha:              {:.2}%", self.alpha)?;
        writeln!(f, "  Beta:               {:.2}", self.beta)?;
        writeln!(f, "  Information Ratio:  {:.2}", self.information_ratio)?;
        Ok(())
    }
}
