//! Descriptive statistics over return samples.

use crate::error::{RiskError, RiskResult};

/// Reject NaN and infinite values.
///
/// # Errors
///
/// Returns `InvalidInput` naming the first offending index.
pub fn ensure_finite(field: &str, values: &[f64]) -> RiskResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(RiskError::invalid_input(
            field,
            format!("non-finite value {} at index {i}", values[i]),
        )),
        None => Ok(()),
    }
}

/// Arithmetic mean. Returns 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N-1 denominator).
///
/// Returns 0 when fewer than two values are supplied.
#[must_use]
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mu = mean(values);
    let ss: f64 = values.iter().map(|v| (v - mu) * (v - mu)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Empirical percentile of an ascending-sorted sample, `p` in [0, 1].
///
/// Linear interpolation between the two bracketing order statistics at rank
/// `p * (n - 1)`. The caller guarantees `sorted` is non-empty.
#[must_use]
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Sort a copy of the sample ascending.
///
/// Callers validate finiteness first, so `total_cmp` orders real numbers only.
#[must_use]
pub fn sorted_ascending(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Pearson correlation of two equally long samples.
///
/// Returns 0 when either side has zero variance.
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}
