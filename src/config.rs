//! TOML configuration
//!
//! Every field has a default, so an empty file (or no file) is valid.

use crate::allocation::StaticSectorLookup;
use crate::data::benchmarks::DEFAULT_BENCHMARK_SYMBOL;
use crate::data::quotes::Period;
use crate::error::{PortfolioError, Result};
use crate::finance::constants::DEFAULT_RISK_FREE_RATE;
use crate::finance::CostBasisMethod;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub default_period: Period,
    #[serde(default = "default_benchmark_symbol")]
    pub benchmark_symbol: String,
    #[serde(default = "default_cost_basis_method")]
    pub cost_basis_method: CostBasisMethod,
    /// SQLite transaction log; the CLI picks a home-directory default when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub quotes: QuotesConfig,
    /// Symbol to sector label
    #[serde(default)]
    pub sectors: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotesConfig {
    /// Fetch equity quotes from the live feed (requires the `live` feature)
    #[serde(default)]
    pub live: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_risk_free_rate() -> f64 {
    DEFAULT_RISK_FREE_RATE
}

fn default_benchmark_symbol() -> String {
    DEFAULT_BENCHMARK_SYMBOL.to_string()
}

fn default_cost_basis_method() -> CostBasisMethod {
    CostBasisMethod::Average
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            live: false,
            cache_ttl_secs: default_cache_ttl_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl QuotesConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            default_period: Period::default(),
            benchmark_symbol: default_benchmark_symbol(),
            cost_basis_method: default_cost_basis_method(),
            database_path: None,
            quotes: QuotesConfig::default(),
            sectors: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| PortfolioError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load from `path`; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            PortfolioError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() || self.risk_free_rate <= -1.0 {
            return Err(PortfolioError::ConfigError(format!(
                "risk_free_rate must be a finite rate above -100%, got {}",
                self.risk_free_rate
            )));
        }
        if self.benchmark_symbol.trim().is_empty() {
            return Err(PortfolioError::ConfigError(
                "benchmark_symbol must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PortfolioError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    pub fn sector_lookup(&self) -> StaticSectorLookup {
        self.sectors
            .iter()
            .map(|(symbol, sector)| (symbol.clone(), sector.clone()))
            .collect()
    }
}
