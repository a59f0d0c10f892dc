use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rusty_portfolio::analytics::{
    calculate_performance_metrics, calculate_risk_metrics, CorrelationMatrix,
};
use rusty_portfolio::data::{DeterministicSyntheticProvider, Period};
use rusty_portfolio::finance::Ledger;
use rusty_portfolio::instrument::Instrument;
use rusty_portfolio::returns::build_return_series;
use rusty_portfolio::valuation::value_portfolio;

fn five_year_returns() -> Vec<f64> {
    (0..1260)
        .map(|i| ((i * 37 % 101) as f64 - 50.0) / 5000.0)
        .collect()
}

fn sample_ledger() -> Ledger {
    let date = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut ledger = Ledger::default();
    for i in 0..12 {
        ledger
            .add(Instrument::equity(format!("EQ{}.NS", i)), 10.0, 100.0 + i as f64, date)
            .unwrap();
    }
    for i in 0..6 {
        ledger
            .add(Instrument::mutual_fund(format!("INF{:09}", i)), 500.0, 40.0, date)
            .unwrap();
    }
    ledger
}

fn benchmark_performance_metrics(c: &mut Criterion) {
    let returns = five_year_returns();
    let benchmark: Vec<f64> = returns.iter().map(|r| r * 0.8 + 0.0002).collect();

    c.bench_function("performance_metrics_5y", |b| {
        b.iter(|| {
            calculate_performance_metrics(
                black_box(&returns),
                Some(black_box(benchmark.as_slice())),
                0.02,
            )
        });
    });
}

fn benchmark_risk_metrics(c: &mut Criterion) {
    let returns = five_year_returns();

    c.bench_function("risk_metrics_5y", |b| {
        b.iter(|| calculate_risk_metrics(black_box(&returns), None));
    });
}

fn benchmark_correlation_matrix(c: &mut Criterion) {
    let series: Vec<(String, Vec<f64>)> = (0..18)
        .map(|k| {
            let returns = (0..1260)
                .map(|i| (((i + k * 13) * 37 % 101) as f64 - 50.0) / 5000.0)
                .collect();
            (format!("ASSET{}", k), returns)
        })
        .collect();

    c.bench_function("correlation_matrix_18x1260", |b| {
        b.iter(|| CorrelationMatrix::from_series(black_box(&series)));
    });
}

fn benchmark_pipeline(c: &mut Criterion) {
    let ledger = sample_ledger();
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    let provider = DeterministicSyntheticProvider::new(as_of);

    c.bench_function("valuation_18_positions", |b| {
        b.iter(|| value_portfolio(black_box(&ledger), &provider));
    });

    c.bench_function("return_series_1y", |b| {
        b.iter(|| build_return_series(black_box(&ledger), &provider, Period::OneYear));
    });
}

criterion_group!(
    benches,
    benchmark_performance_metrics,
    benchmark_risk_metrics,
    benchmark_correlation_matrix,
    benchmark_pipeline
);
criterion_main!(benches);
