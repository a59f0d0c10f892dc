//! Asset correlation matrix

use crate::analytics::stats::pearson_correlation;
use crate::instrument::InstrumentKey;
use crate::returns::ReturnSeries;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

/// Symmetric Pearson correlation matrix across held instruments
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Build from labelled, equally long return series. Fewer than two series
    /// yields an empty matrix.
    pub fn from_series(series: &[(String, Vec<f64>)]) -> Self {
        if series.len() < 2 {
            return Self::default();
        }

        // upper triangle in parallel, mirrored below the diagonal
        let upper: Vec<Vec<f64>> = (0..series.len())
            .into_par_iter()
            .map(|i| {
                series[i + 1..]
                    .iter()
                    .map(|(_, b)| pearson_correlation(&series[i].1, b))
                    .collect()
            })
            .collect();

        let n = series.len();
        let mut values = vec![vec![1.0; n]; n];
        for (i, row) in upper.iter().enumerate() {
            for (offset, value) in row.iter().enumerate() {
                let j = i + 1 + offset;
                values[i][j] = *value;
                values[j][i] = *value;
            }
        }

        Self {
            labels: series.iter().map(|(label, _)| label.clone()).collect(),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Correlation between two labels
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.values[i][j])
    }

    /// Correlation between two instruments of an asset matrix
    pub fn get_by_key(&self, a: &InstrumentKey, b: &InstrumentKey) -> Option<f64> {
        self.get(&a.to_string(), &b.to_string())
    }
}

/// Correlation matrix of the instruments in a return series, labelled by
/// instrument key so an equity and a fund sharing a code stay apart
pub fn asset_correlation_matrix(series: &ReturnSeries) -> CorrelationMatrix {
    let labelled: Vec<(String, Vec<f64>)> = series
        .instrument_returns
        .iter()
        .map(|r| (r.instrument.key().to_string(), r.returns.clone()))
        .collect();
    CorrelationMatrix::from_series(&labelled)
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.labels.iter().map(|l| l.len()).max().unwrap_or(0).max(6);

        write!(f, "{:width$}", "", width = width)?;
        for label in &self.labels {
            write!(f, " {:>width$}", label, width = width)?;
        }
        writeln!(f)?;

        for (label, row) in self.labels.iter().zip(&self.values) {
            write!(f, "{:width$}", label, width = width)?;
            for value in row {
                write!(f, " {:>width$.2}", value, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
