//! Analytics constants and defaults
//!
//! Contains default values and constants shared by the ledger and the metrics

/// Trading days used to annualize daily statistics
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Trading days compounded into one approximate month
pub const TRADING_DAYS_PER_MONTH: usize = 21;

/// Default annual risk-free rate
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Fewest observations for performance metrics
pub const MIN_PERFORMANCE_OBSERVATIONS: usize = 2;

/// Fewest observations for historical VaR and risk metrics
pub const MIN_RISK_OBSERVATIONS: usize = 30;

/// Fewest monthly blocks for an empirical monthly VaR
pub const MIN_MONTHLY_BLOCKS: usize = 10;

/// Sortino denominator when there is no negative excess return
pub const SORTINO_DOWNSIDE_FLOOR: f64 = 0.0001;

/// Zero tolerance for floating point comparisons
pub const ZERO_TOLERANCE: f64 = 1e-10;
