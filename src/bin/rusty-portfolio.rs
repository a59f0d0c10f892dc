//! rusty-portfolio CLI - record trades and report on a personal portfolio
//!
//! ## Example Usage
//!
//! ```bash
//! # Record trades
//! rusty-portfolio buy TCS.NS 8 3500 --date 2022-02-10
//! rusty-portfolio buy INF179K01BB8 500 85.25 --asset-class mf --name "HDFC Top 100 Fund"
//! rusty-portfolio sell TCS.NS 3 3900
//!
//! # Reports
//! rusty-portfolio value
//! rusty-portfolio metrics --period 6mo
//! rusty-portfolio allocation --json
//!
//! # Walk through the sample book
//! rusty-portfolio demo
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rusty_portfolio::data::{
    AssetClassRouter, CachingProvider, QuoteBenchmark, RetryingProvider,
};
use rusty_portfolio::finance::csv_io::{
    read_transactions_from_path, write_transactions, write_transactions_to_path,
};
use rusty_portfolio::finance::SqliteRepository;
use rusty_portfolio::prelude::*;
use rusty_portfolio::valuation::ValuationStatus;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// rusty-portfolio: transaction ledger with valuation and risk analytics
#[derive(Parser)]
#[command(name = "rusty-portfolio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Portfolio ledger with valuation, returns and risk analytics", long_about = None)]
struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Transaction database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a purchase
    Buy {
        #[command(flatten)]
        trade: TradeArgs,
    },

    /// Record a sale
    Sell {
        #[command(flatten)]
        trade: TradeArgs,
    },

    /// List open positions
    Positions,

    /// Show the transaction log
    Transactions {
        /// Only transactions for this symbol
        #[arg(value_name = "SYMBOL")]
        symbol: Option<String>,
    },

    /// Value the portfolio at current prices
    Value,

    /// Show the weighted daily return series
    Returns {
        /// Lookback period (1mo, 3mo, 6mo, 1y, 2y, 5y)
        #[arg(short, long)]
        period: Option<Period>,
    },

    /// Performance metrics against the benchmark
    Metrics {
        #[arg(short, long)]
        period: Option<Period>,

        /// Skip the benchmark (alpha, beta and information ratio stay 0)
        #[arg(long)]
        no_benchmark: bool,
    },

    /// Historical risk metrics and asset correlations
    Risk {
        #[arg(short, long)]
        period: Option<Period>,
    },

    /// Sector and asset class allocation
    Allocation,

    /// Import transactions from CSV
    Import {
        #[arg(value_name = "CSV_FILE")]
        file: PathBuf,
    },

    /// Export the transaction log as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load the sample book into memory and print every report
    Demo {
        #[arg(short, long)]
        period: Option<Period>,
    },
}

#[derive(clap::Args)]
struct TradeArgs {
    /// Ticker or fund code
    #[arg(value_name = "SYMBOL")]
    symbol: String,

    /// Units
    #[arg(value_name = "QUANTITY")]
    quantity: f64,

    /// Price or NAV per unit
    #[arg(value_name = "PRICE")]
    price: f64,

    /// Trade date (YYYY-MM-DD, default today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// equity or mf
    #[arg(short, long, default_value = "equity")]
    asset_class: AssetClass,

    /// Display name
    #[arg(short, long)]
    name: Option<String>,
}

impl TradeArgs {
    fn instrument(&self) -> Instrument {
        let instrument = Instrument::new(self.symbol.to_uppercase(), self.asset_class);
        match &self.name {
            Some(name) => instrument.with_name(name.clone()),
            None => instrument,
        }
    }

    fn trade_date(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rusty-portfolio")
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_dir().join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if cli.verbose {
        println!(
            "{} v{}",
            "rusty-portfolio".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!("Config: {}", config_path.display().to_string().dimmed());
    }

    let output = Output { json: cli.json };
    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| config_dir().join("portfolio.db"));
    let open = || open_portfolio(&db_path, &config);
    let period_or_default = |period: Option<Period>| period.unwrap_or(config.default_period);

    match cli.command {
        Commands::Buy { trade } => {
            let txn = open()?.buy(
                trade.instrument(),
                trade.quantity,
                trade.price,
                trade.trade_date(),
            )?;
            output.transaction_recorded(&txn)
        }
        Commands::Sell { trade } => {
            let txn = open()?.sell(
                trade.instrument(),
                trade.quantity,
                trade.price,
                trade.trade_date(),
            )?;
            output.transaction_recorded(&txn)
        }
        Commands::Positions => output.positions(open()?.ledger()),
        Commands::Transactions { symbol } => {
            let portfolio = open()?;
            let symbol = symbol.map(|s| s.to_uppercase());
            let transactions: Vec<&Transaction> = portfolio
                .ledger()
                .transactions()
                .iter()
                .filter(|t| symbol.as_ref().map_or(true, |s| &t.instrument.symbol == s))
                .collect();
            output.transactions(&transactions)
        }
        Commands::Value => {
            let portfolio = open()?;
            let quotes = quote_provider(&config, portfolio.ledger())?;
            output.snapshot(&value_portfolio(portfolio.ledger(), quotes.as_ref()))
        }
        Commands::Returns { period } => {
            let portfolio = open()?;
            let quotes = quote_provider(&config, portfolio.ledger())?;
            let series =
                build_return_series(portfolio.ledger(), quotes.as_ref(), period_or_default(period));
            output.returns(&series)
        }
        Commands::Metrics {
            period,
            no_benchmark,
        } => {
            let portfolio = open()?;
            let quotes = quote_provider(&config, portfolio.ledger())?;
            let series =
                build_return_series(portfolio.ledger(), quotes.as_ref(), period_or_default(period));
            let benchmark = QuoteBenchmark::new(quotes.clone(), config.benchmark_symbol.clone());
            let benchmark = (!no_benchmark).then_some(&benchmark as &dyn BenchmarkProvider);
            output.performance(&analyze(&series, benchmark, config.risk_free_rate))
        }
        Commands::Risk { period } => {
            let portfolio = open()?;
            let quotes = quote_provider(&config, portfolio.ledger())?;
            let series =
                build_return_series(portfolio.ledger(), quotes.as_ref(), period_or_default(period));
            let benchmark = QuoteBenchmark::new(quotes.clone(), config.benchmark_symbol.clone());
            let report = analyze(
                &series,
                Some(&benchmark as &dyn BenchmarkProvider),
                config.risk_free_rate,
            );
            output.risk(&report, &asset_correlation_matrix(&series))
        }
        Commands::Allocation => {
            let portfolio = open()?;
            let quotes = quote_provider(&config, portfolio.ledger())?;
            let snapshot = value_portfolio(portfolio.ledger(), quotes.as_ref());
            output.allocation(&snapshot, &config.sector_lookup())
        }
        Commands::Import { file } => {
            let records = read_transactions_from_path(&file)?;
            let imported = open()?.import(&records)?;
            println!(
                "{} Imported {} transactions from {}",
                "✓".green().bold(),
                imported,
                file.display()
            );
            Ok(())
        }
        Commands::Export { output: path } => {
            let portfolio = open()?;
            let transactions = portfolio.ledger().transactions();
            match path {
                Some(path) => {
                    write_transactions_to_path(&path, transactions)?;
                    println!(
                        "{} Exported {} transactions to {}",
                        "✓".green().bold(),
                        transactions.len(),
                        path.display()
                    );
                }
                None => write_transactions(io::stdout().lock(), transactions)?,
            }
            Ok(())
        }
        Commands::Demo { period } => run_demo(&config, period_or_default(period), output),
    }
}

fn open_portfolio(db_path: &Path, config: &Config) -> Result<Portfolio<SqliteRepository>> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let repository = SqliteRepository::new(db_path)?;
    let portfolio = Portfolio::open_with_method(repository, config.cost_basis_method)?;
    log::debug!(
        "Opened {} with {} transactions",
        db_path.display(),
        portfolio.ledger().transaction_count()
    );
    Ok(portfolio)
}

/// Equities from the live feed when enabled, everything else from synthetic
/// walks anchored at each position's first purchase
fn quote_provider(config: &Config, ledger: &Ledger) -> Result<Arc<dyn QuoteProvider>> {
    let today = chrono::Local::now().date_naive();
    let synthetic = DeterministicSyntheticProvider::anchored_to(today, ledger);
    let router = AssetClassRouter::new(
        equity_provider(config, synthetic.clone())?,
        Box::new(synthetic),
    );
    let retrying = RetryingProvider::new(
        router,
        config.quotes.max_retries,
        config.quotes.retry_backoff(),
    );
    Ok(Arc::new(CachingProvider::new(
        retrying,
        config.quotes.cache_ttl(),
    )))
}

#[cfg(feature = "live")]
fn equity_provider(
    config: &Config,
    synthetic: DeterministicSyntheticProvider,
) -> Result<Box<dyn QuoteProvider>> {
    if config.quotes.live {
        return Ok(Box::new(rusty_portfolio::data::YahooQuoteProvider::new()?));
    }
    Ok(Box::new(synthetic))
}

#[cfg(not(feature = "live"))]
fn equity_provider(
    config: &Config,
    synthetic: DeterministicSyntheticProvider,
) -> Result<Box<dyn QuoteProvider>> {
    if config.quotes.live {
        log::warn!("Live quotes requested but the `live` feature is disabled; using synthetic prices");
    }
    Ok(Box::new(synthetic))
}

// Sample book: (symbol, units, price, purchase date, name, sector)
const SAMPLE_EQUITIES: &[(&str, f64, f64, &str, &str, &str)] = &[
    ("RELIANCE.NS", 15.0, 2450.0, "2022-01-15", "Reliance Industries", "Energy"),
    ("TCS.NS", 8.0, 3500.0, "2022-02-10", "Tata Consultancy Services", "Technology"),
    ("INFY.NS", 20.0, 1800.0, "2022-03-05", "Infosys", "Technology"),
    ("HDFCBANK.NS", 10.0, 1500.0, "2022-04-20", "HDFC Bank", "Banking"),
    ("BAJFINANCE.NS", 25.0, 6500.0, "2022-05-12", "Bajaj Finance", "Financial Services"),
    ("ASIANPAINT.NS", 8.0, 3200.0, "2022-06-05", "Asian Paints", "Consumer"),
    ("MARUTI.NS", 5.0, 8500.0, "2022-07-10", "Maruti Suzuki", "Automotive"),
    ("SUNPHARMA.NS", 15.0, 850.0, "2022-08-15", "Sun Pharma", "Pharmaceuticals"),
    ("POWERGRID.NS", 40.0, 210.0, "2022-09-08", "Power Grid", "Utilities"),
    ("ADANIPORTS.NS", 18.0, 780.0, "2022-10-12", "Adani Ports", "Infrastructure"),
    ("HCLTECH.NS", 12.0, 1150.0, "2022-11-08", "HCL Technologies", "Technology"),
    ("BRITANNIA.NS", 6.0, 3900.0, "2022-12-15", "Britannia Industries", "FMCG"),
];

const SAMPLE_FUNDS: &[(&str, f64, f64, &str, &str, &str)] = &[
    ("INF179K01BB8", 500.0, 85.25, "2022-02-05", "HDFC Top 100 Fund - Direct Plan - Growth Option", "Large Cap Fund"),
    ("INF209K01VL4", 750.0, 125.50, "2022-03-15", "ICICI Prudential Bluechip Fund - Direct Plan - Growth Option", "Large Cap Fund"),
    ("INF846K01PE0", 1000.0, 45.75, "2022-04-20", "Axis Long Term Equity Fund - Direct Plan - Growth Option", "ELSS Fund"),
    ("INF090I01KJ8", 2000.0, 35.40, "2022-05-10", "Aditya Birla Sun Life Corporate Bond Fund - Direct Plan - Growth Option", "Debt Fund"),
    ("INF109K01VK7", 1500.0, 42.30, "2022-07-05", "SBI Equity Hybrid Fund - Direct Plan - Growth Option", "Hybrid Fund"),
    ("INF204KB14M2", 1200.0, 150.25, "2022-09-15", "UTI Nifty Index Fund - Direct Plan - Growth Option", "Index Fund"),
];

fn run_demo(config: &Config, period: Period, output: Output) -> Result<()> {
    let mut portfolio =
        Portfolio::open_with_method(InMemoryRepository::new(), config.cost_basis_method)?;
    let mut sectors = config.sector_lookup();

    for (book, asset_class) in [
        (SAMPLE_EQUITIES, AssetClass::Equity),
        (SAMPLE_FUNDS, AssetClass::MutualFund),
    ] {
        for &(symbol, units, price, date, name, sector) in book {
            let date: NaiveDate = date.parse().context("sample trade date")?;
            portfolio.buy(Instrument::new(symbol, asset_class).with_name(name), units, price, date)?;
            sectors = sectors.with_sector(symbol, sector);
        }
    }

    let ledger = portfolio.ledger();
    let quotes = quote_provider(config, ledger)?;

    output.positions(ledger)?;
    let snapshot = value_portfolio(ledger, quotes.as_ref());
    output.snapshot(&snapshot)?;

    let series = build_return_series(ledger, quotes.as_ref(), period);
    output.returns(&series)?;

    let benchmark = QuoteBenchmark::new(quotes.clone(), config.benchmark_symbol.clone());
    let report = analyze(&series, Some(&benchmark), config.risk_free_rate);
    output.performance(&report)?;
    output.risk(&report, &asset_correlation_matrix(&series))?;
    output.allocation(&snapshot, &sectors)
}

/// Table or JSON rendering of each report
#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn transaction_recorded(&self, txn: &Transaction) -> Result<()> {
        if self.json {
            return self.emit_json(txn);
        }
        println!(
            "{} #{} {} {} x {} @ {:.2} on {}",
            "✓".green().bold(),
            txn.sequence,
            txn.action.as_str().to_uppercase().bold(),
            txn.quantity,
            txn.instrument.symbol.cyan(),
            txn.price,
            txn.date
        );
        Ok(())
    }

    fn positions(&self, ledger: &Ledger) -> Result<()> {
        let positions = ledger.positions();
        if self.json {
            return self.emit_json(&positions);
        }

        println!("{}", "Positions".cyan().bold());
        if positions.is_empty() {
            println!("  {}", "No open positions".dimmed());
            return Ok(());
        }
        println!(
            "  {:<16} {:<12} {:>12} {:>12} {:>14} {:>12}",
            "Symbol", "Class", "Quantity", "Avg Price", "Cost Basis", "Since"
        );
        for position in &positions {
            println!(
                "  {:<16} {:<12} {:>12.4} {:>12.2} {:>14.2} {:>12}",
                position.instrument.symbol,
                position.instrument.asset_class.to_string(),
                position.quantity,
                position.average_price(),
                position.cost_basis(),
                position.acquired_on()
            );
        }

        let pnl = ledger.pnl_summary();
        println!();
        println!("  {} {:.2}", "Total cost:".bold(), ledger.total_cost());
        if pnl.total_trades > 0 {
            println!(
                "  {} {} ({} closing trades, {:.1}% winners)",
                "Realized P&L:".bold(),
                signed(pnl.realized_pnl),
                pnl.total_trades,
                pnl.win_rate * 100.0
            );
        }
        println!();
        Ok(())
    }

    fn transactions(&self, transactions: &[&Transaction]) -> Result<()> {
        if self.json {
            return self.emit_json(transactions);
        }

        println!("{}", "Transactions".cyan().bold());
        for txn in transactions {
            println!(
                "  {:>4}  {}  {:<4}  {:<16} {:>12.4} @ {:>10.2}",
                txn.sequence,
                txn.date,
                txn.action.as_str(),
                txn.instrument.symbol,
                txn.quantity,
                txn.price
            );
        }
        println!();
        Ok(())
    }

    fn snapshot(&self, snapshot: &PortfolioSnapshot) -> Result<()> {
        if self.json {
            return self.emit_json(snapshot);
        }

        println!("{}", "Valuation".cyan().bold());
        println!(
            "  {:<16} {:>12} {:>12} {:>14} {:>14} {:>9}",
            "Symbol", "Quantity", "Price", "Value", "Gain/Loss", "%"
        );
        for row in &snapshot.positions {
            match &row.status {
                ValuationStatus::Priced {
                    current_price,
                    current_value,
                    gain_loss,
                    gain_loss_pct,
                } => println!(
                    "  {:<16} {:>12.4} {:>12.2} {:>14.2} {:>14} {:>8.2}%",
                    row.instrument.symbol,
                    row.quantity,
                    current_price,
                    current_value,
                    signed(*gain_loss),
                    gain_loss_pct
                ),
                ValuationStatus::Unavailable { reason } => println!(
                    "  {:<16} {:>12.4} {}",
                    row.instrument.symbol,
                    row.quantity,
                    format!("unavailable: {}", reason).yellow()
                ),
            }
        }

        println!();
        println!("  {} {:.2}", "Total value:".bold(), snapshot.total_value);
        println!("  {} {:.2}", "Total cost: ".bold(), snapshot.total_cost);
        println!(
            "  {} {} ({:.2}%)",
            "Gain/Loss:  ".bold(),
            signed(snapshot.total_gain_loss),
            snapshot.total_gain_loss_pct
        );
        if snapshot.is_partial() {
            println!(
                "  {}",
                "Some positions could not be priced; totals cover priced positions only".yellow()
            );
        }
        println!();
        Ok(())
    }

    fn returns(&self, series: &ReturnSeries) -> Result<()> {
        if self.json {
            return self.emit_json(series);
        }

        println!("{} ({})", "Returns".cyan().bold(), series.period);
        for excluded in &series.excluded {
            println!(
                "  {} {}: {}",
                "excluded".yellow(),
                excluded.instrument.symbol,
                excluded.reason
            );
        }
        match (series.start(), series.end(), series.points.last()) {
            (Some(start), Some(end), Some(last)) => {
                println!("  {} {} to {} ({} days)", "Window:".bold(), start, end, series.len());
                println!(
                    "  {} {}",
                    "Cumulative:".bold(),
                    signed_pct(last.cumulative * 100.0)
                );
            }
            _ => println!("  {}", "No overlapping price history".dimmed()),
        }
        println!();
        Ok(())
    }

    fn performance(&self, report: &AnalyticsReport) -> Result<()> {
        if self.json {
            return self.emit_json(&report.performance);
        }
        println!("{}", report.performance);
        if report.benchmark_observations == 0 {
            println!("  {}", "No benchmark overlap; relative metrics are 0".dimmed());
        }
        println!();
        Ok(())
    }

    fn risk(&self, report: &AnalyticsReport, correlations: &CorrelationMatrix) -> Result<()> {
        if self.json {
            #[derive(Serialize)]
            struct RiskOutput<'a> {
                risk: &'a RiskMetrics,
                correlations: &'a CorrelationMatrix,
            }
            return self.emit_json(&RiskOutput {
                risk: &report.risk,
                correlations,
            });
        }

        println!("{}", report.risk);
        if !correlations.is_empty() {
            println!("{}", "Asset Correlations".cyan().bold());
            print!("{}", correlations);
        }
        println!();
        Ok(())
    }

    fn allocation(&self, snapshot: &PortfolioSnapshot, sectors: &dyn SectorLookup) -> Result<()> {
        let by_sector = sector_allocation(snapshot, sectors);
        let by_class = asset_class_allocation(snapshot);
        if self.json {
            #[derive(Serialize)]
            struct AllocationOutput<'a> {
                sectors: &'a [AllocationWeight],
                asset_classes: &'a [AllocationWeight],
            }
            return self.emit_json(&AllocationOutput {
                sectors: &by_sector,
                asset_classes: &by_class,
            });
        }

        for (title, weights) in [("Sector Allocation", &by_sector), ("Asset Classes", &by_class)] {
            println!("{}", title.cyan().bold());
            for weight in weights.iter() {
                println!(
                    "  {:<22} {:>14.2} {:>7.2}%  {}",
                    weight.label,
                    weight.value,
                    weight.weight,
                    "█".repeat((weight.weight / 2.0).round() as usize).blue()
                );
            }
            println!();
        }
        Ok(())
    }
}

fn signed(value: f64) -> colored::ColoredString {
    let text = format!("{:+.2}", value);
    if value >= 0.0 {
        text.green()
    } else {
        text.red()
    }
}

fn signed_pct(value: f64) -> colored::ColoredString {
    let text = format!("{:+.2}%", value);
    if value >= 0.0 {
        text.green()
    } else {
        text.red()
    }
}
