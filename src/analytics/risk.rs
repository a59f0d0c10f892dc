//! Historical risk metrics
//!
//! VaR figures are empirical percentiles reported as positive percentages.
//! Monthly figures compound non-overlapping 21-day blocks.

use crate::analytics::stats::{compound_blocks, mean, pearson_correlation, percentile, population_std};
use crate::finance::constants::{
    MIN_MONTHLY_BLOCKS, MIN_RISK_OBSERVATIONS, TRADING_DAYS_PER_MONTH, TRADING_DAYS_PER_YEAR,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk metrics for a return series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// One-day 95% VaR (%)
    pub daily_var_95: f64,
    /// One-day 99% VaR (%)
    pub daily_var_99: f64,
    /// One-month 95% VaR (%)
    pub monthly_var_95: f64,
    /// One-month 99% VaR (%)
    pub monthly_var_99: f64,
    /// Annualized RMS of negative returns (%)
    pub downside_deviation: f64,
    /// Annualized volatility of monthly blocks (%)
    pub monthly_volatility: f64,
    pub correlation_to_market: f64,
}

/// Monthly VaR: empirical when there are enough blocks, else daily VaR scaled by √21
fn monthly_var(monthly: &[f64], daily_var: f64, q: f64) -> f64 {
    if monthly.len() >= MIN_MONTHLY_BLOCKS {
        percentile(monthly, q)
    } else {
        daily_var * (TRADING_DAYS_PER_MONTH as f64).sqrt()
    }
}

/// Annualized downside deviation, 0 when no return is negative
pub fn downside_deviation(returns: &[f64]) -> f64 {
    let negative_squares: Vec<f64> = returns
        .iter()
        .filter(|r| **r < 0.0)
        .map(|r| r * r)
        .collect();
    if negative_squares.is_empty() {
        return 0.0;
    }
    mean(&negative_squares).sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Calculate risk metrics.
///
/// Fewer than 30 observations yields all-zero metrics. Correlation to the
/// benchmark needs 30 observations on the common length.
pub fn calculate_risk_metrics(returns: &[f64], benchmark: Option<&[f64]>) -> RiskMetrics {
    if returns.len() < MIN_RISK_OBSERVATIONS {
        return RiskMetrics::default();
    }

    let daily_var_95 = percentile(returns, 5.0);
    let daily_var_99 = percentile(returns, 1.0);

    let monthly = compound_blocks(returns, TRADING_DAYS_PER_MONTH);
    let monthly_var_95 = monthly_var(&monthly, daily_var_95, 5.0);
    let monthly_var_99 = monthly_var(&monthly, daily_var_99, 1.0);

    let monthly_volatility = if monthly.len() >= MIN_MONTHLY_BLOCKS {
        population_std(&monthly) * 12f64.sqrt()
    } else {
        0.0
    };

    let correlation_to_market = match benchmark {
        Some(b) if returns.len().min(b.len()) >= MIN_RISK_OBSERVATIONS => {
            pearson_correlation(returns, b)
        }
        _ => 0.0,
    };

    RiskMetrics {
        daily_var_95: daily_var_95.abs() * 100.0,
        daily_var_99: daily_var_99.abs() * 100.0,
        monthly_var_95: monthly_var_95.abs() * 100.0,
        monthly_var_99: monthly_var_99.abs() * 100.0,
        downside_deviation: downside_deviation(returns) * 100.0,
        monthly_volatility: monthly_volatility * 100.0,
        correlation_to_market,
    }
}

impl fmt::Display for RiskMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Risk Metrics:")?;
        writeln!(f, "  Daily VaR (95%):        {:.2}%", self.daily_var_95)?;
        writeln!(f, "  Daily VaR (99%):        {:.2}%", self.daily_var_99)?;
        writeln!(f, "  Monthly VaR (95%):      {:.2}%", self.monthly_var_95)?;
        writeln!(f, "  Monthly VaR (99%):      {:.2}%", self.monthly_var_99)?;
        writeln!(f, "  Downside Deviation:     {:.2}%", self.downside_deviation)?;
        writeln!(f, "  Monthly Volatility:     {:.2}%", self.monthly_volatility)?;
        writeln!(f, "  Correlation to Market:  {:.2}", self.correlation_to_market)?;
        Ok(())
    }
}
