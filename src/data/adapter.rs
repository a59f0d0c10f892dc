//! Quote provider adapters: retry with backoff, short-TTL caching
//!
//! Both wrap any [`QuoteProvider`] and are themselves providers, so the
//! valuation and returns code is unaware of them.

use crate::data::quotes::{Period, QuoteProvider};
use crate::error::{PortfolioError, Result};
use crate::instrument::{Instrument, InstrumentKey};
use crate::types::{Price, PricePoint};
use hashbrown::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Retry transient failures with exponential backoff
#[derive(Debug)]
pub struct RetryingProvider<P> {
    inner: P,
    max_retries: u32,
    backoff: Duration,
}

impl<P: QuoteProvider> RetryingProvider<P> {
    pub fn new(inner: P, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn with_retry<T>(&self, symbol: &str, mut call: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    log::warn!(
                        "{} quote for {} failed ({}), retry {}/{} in {:?}",
                        self.inner.name(),
                        symbol,
                        e,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<P: QuoteProvider> QuoteProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        self.with_retry(&instrument.symbol, || self.inner.current_price(instrument))
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        self.with_retry(&instrument.symbol, || {
            self.inner.price_history(instrument, period)
        })
    }

    /// Batch first, then retry only the transient failures one by one
    fn current_prices(&self, instruments: &[Instrument]) -> Vec<Result<Price>> {
        self.inner
            .current_prices(instruments)
            .into_iter()
            .zip(instruments)
            .map(|(result, instrument)| match result {
                Err(e) if e.is_transient() => self.current_price(instrument),
                other => other,
            })
            .collect()
    }
}

struct CacheEntry<T> {
    stored_at: Instant,
    value: T,
}

/// Memoize successful quotes for a short TTL
pub struct CachingProvider<P> {
    inner: P,
    ttl: Duration,
    prices: Mutex<HashMap<InstrumentKey, CacheEntry<Price>>>,
    histories: Mutex<HashMap<(InstrumentKey, Period), CacheEntry<Vec<PricePoint>>>>,
}

impl<P: QuoteProvider> CachingProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            prices: Mutex::new(HashMap::new()),
            histories: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every cached entry
    pub fn clear(&self) -> Result<()> {
        self.prices
            .lock()
            .map_err(|_| PortfolioError::LockPoisoned)?
            .clear();
        self.histories
            .lock()
            .map_err(|_| PortfolioError::LockPoisoned)?
            .clear();
        Ok(())
    }

    fn cached_price(&self, key: &InstrumentKey) -> Result<Option<Price>> {
        let prices = self.prices.lock().map_err(|_| PortfolioError::LockPoisoned)?;
        Ok(prices
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value))
    }

    fn store_price(&self, key: InstrumentKey, price: Price) -> Result<()> {
        self.prices
            .lock()
            .map_err(|_| PortfolioError::LockPoisoned)?
            .insert(
                key,
                CacheEntry {
                    stored_at: Instant::now(),
                    value: price,
                },
            );
        Ok(())
    }
}

impl<P: QuoteProvider> QuoteProvider for CachingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn current_price(&self, instrument: &Instrument) -> Result<Price> {
        let key = instrument.key();
        if let Some(price) = self.cached_price(&key)? {
            log::debug!("Cache hit for {}", key);
            return Ok(price);
        }

        let price = self.inner.current_price(instrument)?;
        self.store_price(key, price)?;
        Ok(price)
    }

    fn price_history(&self, instrument: &Instrument, period: Period) -> Result<Vec<PricePoint>> {
        let key = (instrument.key(), period);
        {
            let histories = self
                .histories
                .lock()
                .map_err(|_| PortfolioError::LockPoisoned)?;
            if let Some(entry) = histories
                .get(&key)
                .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            {
                log::debug!("Cache hit for {} history ({})", key.0, period);
                return Ok(entry.value.clone());
            }
        }

        let history = self.inner.price_history(instrument, period)?;
        self.histories
            .lock()
            .map_err(|_| PortfolioError::LockPoisoned)?
            .insert(
                key,
                CacheEntry {
                    stored_at: Instant::now(),
                    value: history.clone(),
                },
            );
        Ok(history)
    }

    /// Only cache misses go to the inner provider, in a single batch
    fn current_prices(&self, instruments: &[Instrument]) -> Vec<Result<Price>> {
        let mut results: Vec<Option<Result<Price>>> = Vec::with_capacity(instruments.len());
        let mut misses = Vec::new();

        for (idx, instrument) in instruments.iter().enumerate() {
            match self.cached_price(&instrument.key()) {
                Ok(Some(price)) => results.push(Some(Ok(price))),
                Ok(None) => {
                    results.push(None);
                    misses.push(idx);
                }
                Err(e) => results.push(Some(Err(e))),
            }
        }

        if !misses.is_empty() {
            let batch: Vec<Instrument> = misses.iter().map(|&i| instruments[i].clone()).collect();
            for (idx, result) in misses.into_iter().zip(self.inner.current_prices(&batch)) {
                if let Ok(price) = &result {
                    if let Err(e) = self.store_price(instruments[idx].key(), *price) {
                        log::warn!("Failed to cache price for {}: {}", instruments[idx].symbol, e);
                    }
                }
                results[idx] = Some(result);
            }
        }

        results
            .into_iter()
            .zip(instruments)
            .map(|(result, instrument)| {
                result.unwrap_or_else(|| {
                    Err(PortfolioError::quote_unavailable(
                        &instrument.symbol,
                        "provider returned no result",
                    ))
                })
            })
            .collect()
    }
}
