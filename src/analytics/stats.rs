//! Descriptive statistics over return samples
//!
//! Dispersion measures are sample (n-1) unless named `population_*`.
//! Degenerate samples return 0 instead of NaN.

use crate::finance::constants::ZERO_TOLERANCE;
use statrs::statistics::Statistics;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Sample standard deviation
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

/// Sample variance
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().variance()
}

pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Sample covariance over the common prefix of `a` and `b`
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    a[..n].iter().covariance(b[..n].iter())
}

/// Pearson correlation, 0 when either side has no dispersion
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);

    let denominator = sample_std(a) * sample_std(b);
    if denominator <= ZERO_TOLERANCE {
        return 0.0;
    }
    sample_covariance(a, b) / denominator
}

/// Percentile `q` (0-100) with linear interpolation between closest ranks
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (sorted.len() - 1) as f64 * q.clamp(0.0, 100.0) / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Compound non-overlapping blocks of `block` returns; a trailing partial block is dropped
pub fn compound_blocks(returns: &[f64], block: usize) -> Vec<f64> {
    if block == 0 {
        return Vec::new();
    }
    returns
        .chunks_exact(block)
        .map(|chunk| chunk.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_and_std() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(mean(&values), 2.5);
        // sample variance = 5/3
        assert_abs_diff_eq!(sample_variance(&values), 5.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample_std(&values), (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(population_std(&values), 1.25f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_samples() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
        assert_eq!(sample_covariance(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0, 1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(percentile(&[], 5.0), 0.0);
    }

    #[test]
    fn test_covariance_and_correlation() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        assert_abs_diff_eq!(sample_covariance(&a, &b), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pearson_correlation(&a, &b), 1.0, epsilon = 1e-12);

        let c = [3.0, 2.0, 1.0];
        assert_abs_diff_eq!(pearson_correlation(&a, &c), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_percentile_linear() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_abs_diff_eq!(percentile(&values, 50.0), 3.0);
        assert_abs_diff_eq!(percentile(&values, 5.0), 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&values, 100.0), 5.0);
        assert_abs_diff_eq!(percentile(&[5.0, 1.0], 25.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compound_blocks() {
        let returns = [0.1, 0.1, -0.5, 0.0, 0.3];
        let blocks = compound_blocks(&returns, 2);
        assert_eq!(blocks.len(), 2);
        assert_abs_diff_eq!(blocks[0], 0.21, epsilon = 1e-12);
        assert_abs_diff_eq!(blocks[1], -0.5, epsilon = 1e-12);
    }
}
