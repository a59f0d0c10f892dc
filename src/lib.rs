//! # Rusty-Portfolio
//!
//! A transaction ledger for a personal portfolio of equities and mutual funds,
//! with market valuation, weighted return series and performance/risk analytics.
//!
//! Positions are never stored directly: they are derived from an append-only
//! log of buy and sell transactions, persisted through a
//! [`TransactionRepository`](finance::TransactionRepository) and replayed on open.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rusty_portfolio::prelude::*;
//! use chrono::NaiveDate;
//!
//! fn main() -> Result<()> {
//!     let mut portfolio = Portfolio::open(InMemoryRepository::new())?;
//!     let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//!     portfolio.buy(Instrument::equity("TCS.NS"), 10.0, 3500.0, day)?;
//!
//!     let today = chrono::Local::now().date_naive();
//!     let quotes = DeterministicSyntheticProvider::anchored_to(today, portfolio.ledger());
//!     let snapshot = value_portfolio(portfolio.ledger(), &quotes);
//!     println!("Total value: {:.2}", snapshot.total_value);
//!
//!     let series = build_return_series(portfolio.ledger(), &quotes, Period::OneYear);
//!     let report = analyze(&series, None, DEFAULT_RISK_FREE_RATE);
//!     println!("{}", report.performance);
//!     Ok(())
//! }
//! ```

pub mod allocation;
pub mod analytics;
pub mod config;
pub mod data;
pub mod error;
pub mod finance;
pub mod instrument;
pub mod portfolio;
pub mod returns;
pub mod types;
pub mod valuation;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::allocation::{
        asset_class_allocation, sector_allocation, AllocationWeight, SectorLookup,
        StaticSectorLookup,
    };
    pub use crate::analytics::{
        analyze, asset_correlation_matrix, calculate_performance_metrics, calculate_risk_metrics,
        AnalyticsReport, CorrelationMatrix, PerformanceMetrics, RiskMetrics,
    };
    pub use crate::config::Config;
    pub use crate::data::{
        BenchmarkProvider, DeterministicSyntheticProvider, InMemoryQuoteProvider, Period,
        QuoteProvider,
    };
    pub use crate::error::{PortfolioError, Result};
    pub use crate::finance::constants::DEFAULT_RISK_FREE_RATE;
    pub use crate::finance::{
        CostBasisMethod, InMemoryRepository, Ledger, Position, Transaction, TransactionAction,
        TransactionRepository,
    };
    pub use crate::instrument::{AssetClass, Instrument, InstrumentKey};
    pub use crate::portfolio::{Portfolio, SharedPortfolio};
    pub use crate::returns::{build_return_series, ReturnSeries};
    pub use crate::types::*;
    pub use crate::valuation::{value_portfolio, PortfolioSnapshot, PositionValuation};
}
