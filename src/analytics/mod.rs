//! Performance & risk analytics
//!
//! Everything here is a pure function of return values. Benchmark fetching
//! happens in [`analyze`], which degrades relative metrics to 0 when the
//! benchmark is unavailable.

pub mod correlation;
pub mod performance;
pub mod risk;
pub mod stats;

pub use correlation::{asset_correlation_matrix, CorrelationMatrix};
pub use performance::{calculate_performance_metrics, PerformanceMetrics};
pub use risk::{calculate_risk_metrics, RiskMetrics};

use crate::data::benchmarks::{align_with_benchmark, BenchmarkProvider};
use crate::finance::constants::MIN_RISK_OBSERVATIONS;
use crate::returns::ReturnSeries;
use serde::Serialize;

/// Performance and risk of one return series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub performance: PerformanceMetrics,
    pub risk: RiskMetrics,
    /// Observations shared with the benchmark (0 without one)
    pub benchmark_observations: usize,
}

/// Compute metrics for a portfolio series.
///
/// Absolute metrics use the whole series; alpha, beta, information ratio
/// and correlation use only the dates the benchmark also covers.
pub fn analyze(
    series: &ReturnSeries,
    benchmark: Option<&dyn BenchmarkProvider>,
    risk_free_rate: f64,
) -> AnalyticsReport {
    let returns = series.daily_returns();
    let mut report = AnalyticsReport {
        performance: calculate_performance_metrics(&returns, None, risk_free_rate),
        risk: calculate_risk_metrics(&returns, None),
        benchmark_observations: 0,
    };

    let Some(provider) = benchmark else {
        return report;
    };
    let benchmark_returns = match provider.benchmark_returns(series.period) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("Benchmark unavailable, relative metrics set to 0: {}", e);
            return report;
        }
    };

    let aligned = align_with_benchmark(&series.as_daily_returns(), &benchmark_returns);
    report.benchmark_observations = aligned.len();

    let relative =
        calculate_performance_metrics(&aligned.portfolio, Some(&aligned.benchmark), risk_free_rate);
    report.performance.alpha = relative.alpha;
    report.performance.beta = relative.beta;
    report.performance.information_ratio = relative.information_ratio;

    if returns.len() >= MIN_RISK_OBSERVATIONS {
        report.risk.correlation_to_market =
            calculate_risk_metrics(&aligned.portfolio, Some(&aligned.benchmark)).correlation_to_market;
    }

    report
}
