//! Yahoo Finance quote provider
//!
//! Uses the public chart API (no API key required). The provider trait is
//! synchronous, so requests run on a small current-thread tokio runtime
//! owned by the provider.

use crate::data::quotes::{Period, QuoteProvider};
use crate::error::{PortfolioError, Result};
use crate::instrument::Instrument;
use crate::types::{Price, PricePoint};
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Live equity and index quotes
pub struct YahooQuoteProvider {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl YahooQuoteProvider {
    /// Create a new Yahoo Finance provider with a 30s request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| PortfolioError::DataError(format!("Failed to create HTTP client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PortfolioError::DataError(format!("Failed to start runtime: {}", e)))?;

        Ok(Self { client, runtime })
    }

    fn fetch_chart(&self, symbol: &str, range: &str) -> Result<ChartResult> {
        self.runtime.block_on(self.fetch_chart_async(symbol, range))
    }

    async fn fetch_chart_async(&self, symbol: &str, range: &str) -> Result<ChartResult> {
        let url = format!("{}/{}?range={}&interval=1d", YAHOO_CHART_URL, symbol, range);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_request_error(symbol, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(symbol, status));
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify_request_error(symbol, e))?;

        parse_chart(symbol, &text)
    }
}

fn classify_request_error(symbol: &str, error: reqwest::Error) -> PortfolioError {
    let reason = format!("HTTP request failed: {}", error);
    if error.is_timeout() || error.is_connect() || error.is_request() {
        PortfolioError::quote_transient(symbol, reason)
    } else {
        PortfolioError::quote_unavailable(symbol, reason)
    }
}

fn classify_status(symbol: &str, status: StatusCode) -> PortfolioError {
    let reason = format!("Yahoo Finance returned error: {}", status);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        PortfolioError::quote_transient(symbol, reason)
    } else {
        PortfolioError::quote_unavailable(symbol, reason)
    }
}

fn parse_chart(symbol: &str, text: &str) -> Result<ChartResult> {
    let response: ChartResponse = serde_json::from_str(text)
        .map_err(|e| PortfolioError::quote_unavailable(symbol, format!("Malformed chart response: {}", e)))?;

    if let Some(error) = response.chart.error {
        return Err(PortfolioError::quote_unavailable(symbol, error.description));
    }

    response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| PortfolioError::quote_unavailable(symbol, "empty chart result"))
}

/// Regular market price, falling back to the last close
fn market_price(symbol: &str, chart: &ChartResult) -> Result<Price> {
    chart
        .meta
        .regular_market_price
        .or_else(|| closes(chart).last().map(|p| p.close))
        .ok_or_else(|| PortfolioError::quote_unavailable(symbol, "no market price"))
}

/// Daily closes, skipping days without a close
fn closes(result: &ChartResult) -> Vec<PricePoint> {
    let Some(quote) = result.indicators.quote.first() else {
        return Vec::new();
    };

    result
        .timestamp
        .iter()
        .zip(&quote.close)
        .filter_map(|(ts, close)| {
            let close = (*close)?;
            let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(PricePoint::new(date, close))
        })
        .collect()
}

impl QuoteProvider for YahooQuoteProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        let chart = self.fetch_chart(&instrument.symbol, "5d")?;
        market_price(&instrument.symbol, &chart)
    }

    /// Requests for the whole batch run concurrently on the provider's runtime
    fn current_prices(&self, instruments: &[Instrument]) -> Vec<Result<Price>> {
        let requests = instruments.iter().map(|instrument| async move {
            let chart = self.fetch_chart_async(&instrument.symbol, "5d").await?;
            market_price(&instrument.symbol, &chart)
        });
        let prices = self.runtime.block_on(futures::future::join_all(requests));
        log::debug!("Fetched {} quotes concurrently", prices.len());
        prices
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        let chart = self.fetch_chart(&instrument.symbol, period.as_str())?;
        let history = closes(&chart);
        if history.is_empty() {
            log::warn!("Yahoo returned no closes for {}", instrument.symbol);
            return Err(PortfolioError::quote_unavailable(
                &instrument.symbol,
                "no price history",
            ));
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"regularMarketPrice": 2512.5},
                "timestamp": [1704249000, 1704335400, 1704421800],
                "indicators": {"quote": [{"close": [2500.0, null, 2512.5]}]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_provider_creation() {
        assert!(YahooQuoteProvider::new().is_ok());
    }

    #[test]
    fn test_parse_chart() {
        let chart = parse_chart("RELIANCE.NS", SAMPLE).unwrap();
        assert_eq!(chart.meta.regular_market_price, Some(2512.5));

        let history = closes(&chart);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].close, 2500.0);
        assert!(history[0].date < history[1].date);
    }

    #[test]
    fn test_market_price_falls_back_to_last_close() {
        let body = SAMPLE.replace(r#"{"regularMarketPrice": 2512.5}"#, "{}");
        let chart = parse_chart("RELIANCE.NS", &body).unwrap();
        assert_eq!(chart.meta.regular_market_price, None);
        assert_eq!(market_price("RELIANCE.NS", &chart).unwrap(), 2512.5);
    }

    #[test]
    fn test_empty_batch_needs_no_requests() {
        let provider = YahooQuoteProvider::new().unwrap();
        assert!(provider.current_prices(&[]).is_empty());
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("NOPE", body).unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status("X", StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(classify_status("X", StatusCode::BAD_GATEWAY).is_transient());
        assert!(!classify_status("X", StatusCode::NOT_FOUND).is_transient());
    }
}
