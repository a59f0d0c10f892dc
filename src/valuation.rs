//! Valuation Engine - point-in-time snapshot of the ledger at current quotes
//!
//! A position whose quote cannot be fetched stays in the snapshot with an
//! `Unavailable` status; only priced positions enter the totals.

use crate::data::quotes::QuoteProvider;
use crate::error::PortfolioError;
use crate::finance::{Ledger, Position};
use crate::instrument::{AssetClass, Instrument};
use crate::types::{Cash, Price, Quantity, TradeDate};
use serde::Serialize;

/// Gain as a percentage of cost, 0 when there is no cost
pub fn gain_loss_pct(gain_loss: Cash, cost_basis: Cash) -> f64 {
    if cost_basis > 0.0 {
        gain_loss / cost_basis * 100.0
    } else {
        0.0
    }
}

/// Outcome of pricing one position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValuationStatus {
    Priced {
        current_price: Price,
        current_value: Cash,
        gain_loss: Cash,
        gain_loss_pct: f64,
    },
    Unavailable {
        reason: String,
    },
}

/// One row of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionValuation {
    pub instrument: Instrument,
    pub quantity: Quantity,
    pub average_price: Price,
    pub cost_basis: Cash,
    pub acquired_on: TradeDate,
    pub status: ValuationStatus,
}

impl PositionValuation {
    fn priced(position: &Position, current_price: Price) -> Self {
        let cost_basis = position.cost_basis();
        let current_value = position.market_value(current_price);
        let gain_loss = current_value - cost_basis;
        Self {
            instrument: position.instrument.clone(),
            quantity: position.quantity,
            average_price: position.average_price(),
            cost_basis,
            acquired_on: position.acquired_on(),
            status: ValuationStatus::Priced {
                current_price,
                current_value,
                gain_loss,
                gain_loss_pct: gain_loss_pct(gain_loss, cost_basis),
            },
        }
    }

    fn unavailable(position: &Position, reason: String) -> Self {
        Self {
            instrument: position.instrument.clone(),
            quantity: position.quantity,
            average_price: position.average_price(),
            cost_basis: position.cost_basis(),
            acquired_on: position.acquired_on(),
            status: ValuationStatus::Unavailable { reason },
        }
    }

    pub fn is_priced(&self) -> bool {
        matches!(self.status, ValuationStatus::Priced { .. })
    }

    pub fn current_price(&self) -> Option<Price> {
        match self.status {
            ValuationStatus::Priced { current_price, .. } => Some(current_price),
            ValuationStatus::Unavailable { .. } => None,
        }
    }

    pub fn current_value(&self) -> Option<Cash> {
        match self.status {
            ValuationStatus::Priced { current_value, .. } => Some(current_value),
            ValuationStatus::Unavailable { .. } => None,
        }
    }

    pub fn gain_loss(&self) -> Option<Cash> {
        match self.status {
            ValuationStatus::Priced { gain_loss, .. } => Some(gain_loss),
            ValuationStatus::Unavailable { .. } => None,
        }
    }
}

/// Point-in-time valuation of the whole book
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub positions: Vec<PositionValuation>,
    /// Sum of current values of priced positions
    pub total_value: Cash,
    /// Sum of cost bases of priced positions
    pub total_cost: Cash,
    pub total_gain_loss: Cash,
    pub total_gain_loss_pct: f64,
    /// Realized gain from sells recorded in the ledger
    pub realized_gain_loss: Cash,
}

impl PortfolioSnapshot {
    /// Whether any position could not be priced
    pub fn is_partial(&self) -> bool {
        self.positions.iter().any(|p| !p.is_priced())
    }

    pub fn priced(&self) -> impl Iterator<Item = &PositionValuation> {
        self.positions.iter().filter(|p| p.is_priced())
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &PositionValuation> {
        self.positions.iter().filter(|p| !p.is_priced())
    }

    pub fn equities(&self) -> impl Iterator<Item = &PositionValuation> {
        self.by_class(AssetClass::Equity)
    }

    pub fn mutual_funds(&self) -> impl Iterator<Item = &PositionValuation> {
        self.by_class(AssetClass::MutualFund)
    }

    fn by_class(&self, asset_class: AssetClass) -> impl Iterator<Item = &PositionValuation> {
        self.positions
            .iter()
            .filter(move |p| p.instrument.asset_class == asset_class)
    }
}

/// Value every open position at current quotes (one batch quote request)
pub fn value_portfolio(ledger: &Ledger, provider: &dyn QuoteProvider) -> PortfolioSnapshot {
    let positions = ledger.positions();
    let instruments: Vec<Instrument> = positions.iter().map(|p| p.instrument.clone()).collect();
    let mut quotes = provider.current_prices(&instruments);
    if quotes.len() != instruments.len() {
        log::warn!(
            "{} returned {} quotes for {} positions",
            provider.name(),
            quotes.len(),
            instruments.len()
        );
        quotes.truncate(instruments.len());
        for instrument in &instruments[quotes.len()..] {
            quotes.push(Err(PortfolioError::quote_unavailable(
                &instrument.symbol,
                "missing from batch quote response",
            )));
        }
    }

    let mut snapshot = PortfolioSnapshot {
        realized_gain_loss: ledger.pnl_summary().realized_pnl,
        ..Default::default()
    };

    for (position, quote) in positions.into_iter().zip(quotes) {
        let valuation = match quote {
            Ok(price) if price.is_finite() => PositionValuation::priced(position, price),
            Ok(price) => {
                log::warn!("Discarding non-finite quote {} for {}", price, position.instrument.symbol);
                PositionValuation::unavailable(position, format!("non-finite quote {}", price))
            }
            Err(e) => {
                log::warn!("No quote for {}: {}", position.instrument.symbol, e);
                PositionValuation::unavailable(position, e.to_string())
            }
        };

        if let ValuationStatus::Priced { current_value, .. } = valuation.status {
            snapshot.total_value += current_value;
            snapshot.total_cost += valuation.cost_basis;
        }
        snapshot.positions.push(valuation);
    }

    snapshot.total_gain_loss = snapshot.total_value - snapshot.total_cost;
    snapshot.total_gain_loss_pct = gain_loss_pct(snapshot.total_gain_loss, snapshot.total_cost);

    log::debug!(
        "Valued {} positions via {} (partial: {})",
        snapshot.positions.len(),
        provider.name(),
        snapshot.is_partial()
    );
    snapshot
}
