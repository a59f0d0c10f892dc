//! Market data: quote providers, adapters and benchmarks

pub mod adapter;
pub mod benchmarks;
pub mod quotes;
pub mod synthetic;
#[cfg(feature = "live")]
pub mod yahoo;

pub use adapter::{CachingProvider, RetryingProvider};
pub use benchmarks::{
    align_with_benchmark, AlignedReturns, BenchmarkProvider, ConstantBenchmark, QuoteBenchmark,
    StaticBenchmark, DEFAULT_BENCHMARK_SYMBOL,
};
pub use quotes::{AssetClassRouter, InMemoryQuoteProvider, Period, QuoteProvider};
pub use synthetic::{DeterministicSyntheticProvider, NavAnchor};
#[cfg(feature = "live")]
pub use yahoo::YahooQuoteProvider;
