//! Sector/allocation aggregation over a valuation snapshot

use crate::instrument::Instrument;
use crate::valuation::PortfolioSnapshot;
use hashbrown::HashMap;
use serde::Serialize;

/// Label used when no sector is known
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Instrument to sector metadata
pub trait SectorLookup {
    fn sector(&self, instrument: &Instrument) -> Option<String>;
}

/// Sector table keyed by symbol
#[derive(Debug, Clone, Default)]
pub struct StaticSectorLookup {
    sectors: HashMap<String, String>,
}

impl StaticSectorLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sector(mut self, symbol: impl Into<String>, sector: impl Into<String>) -> Self {
        self.sectors.insert(symbol.into(), sector.into());
        self
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for StaticSectorLookup
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            sectors: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SectorLookup for StaticSectorLookup {
    fn sector(&self, instrument: &Instrument) -> Option<String> {
        self.sectors.get(&instrument.symbol).cloned()
    }
}

/// Share of portfolio value in one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationWeight {
    pub label: String,
    pub value: f64,
    /// Percentage of total priced value
    pub weight: f64,
}

/// Accumulate value shares into labelled buckets, in first-appearance order
fn allocate<F>(snapshot: &PortfolioSnapshot, mut label_of: F) -> Vec<AllocationWeight>
where
    F: FnMut(&Instrument) -> String,
{
    let mut buckets: Vec<AllocationWeight> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for position in snapshot.priced() {
        let Some(value) = position.current_value() else {
            continue;
        };
        let label = label_of(&position.instrument);
        match index.get(&label) {
            Some(&i) => buckets[i].value += value,
            None => {
                index.insert(label.clone(), buckets.len());
                buckets.push(AllocationWeight {
                    label,
                    value,
                    weight: 0.0,
                });
            }
        }
    }

    if snapshot.total_value > 0.0 {
        for bucket in &mut buckets {
            bucket.weight = bucket.value / snapshot.total_value * 100.0;
        }
    }
    buckets
}

/// Sector weights of priced positions; unknown sectors are grouped as "Unknown"
pub fn sector_allocation(
    snapshot: &PortfolioSnapshot,
    lookup: &dyn SectorLookup,
) -> Vec<AllocationWeight> {
    allocate(snapshot, |instrument| {
        lookup
            .sector(instrument)
            .unwrap_or_else(|| UNKNOWN_SECTOR.to_string())
    })
}

/// Equity vs mutual fund share of priced value
pub fn asset_class_allocation(snapshot: &PortfolioSnapshot) -> Vec<AllocationWeight> {
    allocate(snapshot, |instrument| instrument.asset_class.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::quotes::InMemoryQuoteProvider;
    use crate::finance::Ledger;
    use crate::valuation::value_portfolio;
    use chrono::NaiveDate;

    fn snapshot() -> PortfolioSnapshot {
        let day = NaiveDate::from_ymd_opt(2022, 1, 15).unwrap();
        let mut ledger = Ledger::default();
        let tcs = Instrument::equity("TCS.NS");
        let infy = Instrument::equity("INFY.NS");
        let reliance = Instrument::equity("RELIANCE.NS");
        let fund = Instrument::mutual_fund("INF179K01BB8");
        let missing = Instrument::equity("MISSING.NS");

        for instrument in [&tcs, &infy, &reliance, &fund, &missing] {
            ledger.add(instrument.clone(), 1.0, 100.0, day).unwrap();
        }

        let provider = InMemoryQuoteProvider::new()
            .with_price(&tcs, 300.0)
            .with_price(&infy, 200.0)
            .with_price(&reliance, 400.0)
            .with_price(&fund, 100.0);
        value_portfolio(&ledger, &provider)
    }

    #[test]
    fn test_sector_allocation() {
        let lookup = StaticSectorLookup::new()
            .with_sector("TCS.NS", "Technology")
            .with_sector("INFY.NS", "Technology")
            .with_sector("RELIANCE.NS", "Energy");

        let weights = sector_allocation(&snapshot(), &lookup);
        let labels: Vec<&str> = weights.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["Technology", "Energy", "Unknown"]);

        let total: f64 = weights.iter().map(|w| w.weight).sum();
        assert!((total - 100.0).abs() < 1e-9);

        let tech = weights.iter().find(|w| w.label == "Technology").unwrap();
        assert!((tech.weight - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_asset_class_allocation() {
        let weights = asset_class_allocation(&snapshot());
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].label, "Equity");
        assert!((weights[0].weight - 90.0).abs() < 1e-9);
        assert!((weights[1].weight - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let weights = sector_allocation(&PortfolioSnapshot::default(), &StaticSectorLookup::new());
        assert!(weights.is_empty());
    }

    #[test]
    fn test_from_iter() {
        let lookup: StaticSectorLookup = vec![("TCS.NS", "Technology")].into_iter().collect();
        assert_eq!(
            lookup.sector(&Instrument::equity("TCS.NS")),
            Some("Technology".to_string())
        );
        assert_eq!(lookup.sector(&Instrument::equity("X")), None);
    }
}
