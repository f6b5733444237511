//! Historical simulation VaR and Expected Shortfall.

use super::metric::{VarEstimate, validate_confidence};
use crate::error::{RiskError, RiskResult};
use crate::stats;

/// Historical VaR: the loss at the `(1 - confidence)` empirical percentile.
///
/// Linear interpolation between the two bracketing order statistics. A
/// single-observation series yields 0.
///
/// # Errors
///
/// - `InsufficientData` for an empty series.
/// - `InvalidInput` for non-finite returns or a confidence outside (0, 1).
pub fn historical_var(returns: &[f64], confidence: f64) -> RiskResult<f64> {
    validate_confidence(confidence)?;
    if returns.is_empty() {
        return Err(RiskError::insufficient("historical_var", 1, 0));
    }
    stats::ensure_finite("returns", returns)?;
    if returns.len() == 1 {
        return Ok(0.0);
    }
    let sorted = stats::sorted_ascending(returns);
    Ok(-stats::percentile_sorted(&sorted, 1.0 - confidence))
}

/// Expected Shortfall: mean loss of the returns at or below `-var_value`.
///
/// Falls back to the worst observed return when interpolation leaves no
/// observation in the tail.
///
/// # Errors
///
/// - `InsufficientData` for an empty series.
/// - `InvalidInput` for non-finite inputs or a confidence outside (0, 1).
pub fn expected_shortfall(returns: &[f64], confidence: f64, var_value: f64) -> RiskResult<f64> {
    validate_confidence(confidence)?;
    if returns.is_empty() {
        return Err(RiskError::insufficient("expected_shortfall", 1, 0));
    }
    stats::ensure_finite("returns", returns)?;
    if !var_value.is_finite() {
        return Err(RiskError::invalid_input("var_value", "must be finite"));
    }

    let cutoff = -var_value;
    let (sum, count) = returns
        .iter()
        .filter(|&&r| r <= cutoff)
        .fold((0.0, 0_usize), |(s, n), r| (s + r, n + 1));

    if count == 0 {
        let worst = returns.iter().copied().fold(f64::INFINITY, f64::min);
        return Ok(-worst);
    }
    Ok(-(sum / count as f64))
}

/// Historical VaR and the matching tail mean in one pass.
///
/// A single observation is degenerate: both figures are 0.
///
/// # Errors
///
/// Same as [`historical_var`].
pub fn historical_estimate(returns: &[f64], confidence: f64) -> RiskResult<VarEstimate> {
    let var = historical_var(returns, confidence)?;
    if returns.len() == 1 {
        return Ok(VarEstimate::ZERO);
    }
    let expected_shortfall = expected_shortfall(returns, confidence, var)?;
    Ok(VarEstimate {
        var,
        expected_shortfall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample() -> Vec<f64> {
        // -0.05, -0.04, ..., 0.04 (ten returns)
        (0..10).map(|i| f64::from(i - 5) / 100.0).collect()
    }

    #[test]
    fn test_single_observation_is_zero() {
        assert_eq!(historical_var(&[-0.03], 0.95).unwrap(), 0.0);
        assert_eq!(historical_estimate(&[-0.03], 0.95).unwrap(), VarEstimate::ZERO);
    }

    #[test]
    fn test_empty_is_insufficient() {
        let err = historical_var(&[], 0.95).unwrap_err();
        assert!(matches!(err, RiskError::InsufficientData { .. }));
    }

    #[test]
    fn test_interpolated_percentile() {
        // p = 0.1, rank = 0.9 -> -0.05 + 0.9 * 0.01 = -0.041
        let var = historical_var(&sample(), 0.90).unwrap();
        assert!((var - 0.041).abs() < 1e-12);
    }

    #[test]
    fn test_expected_shortfall_tail_mean() {
        let returns = sample();
        // Only -0.05 lies at or below -0.041
        let es = expected_shortfall(&returns, 0.90, 0.041).unwrap();
        assert!((es - 0.05).abs() < 1e-12);
        // Cutoff -0.035 captures -0.05 and -0.04
        let es = expected_shortfall(&returns, 0.90, 0.035).unwrap();
        assert!((es - 0.045).abs() < 1e-12);
    }

    #[test]
    fn test_expected_shortfall_falls_back_to_worst() {
        let es = expected_shortfall(&[0.01, 0.02, -0.01], 0.95, 0.5).unwrap();
        assert!((es - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_is_degenerate_constant() {
        let var = historical_var(&[0.01; 5], 0.95).unwrap();
        assert!((var + 0.01).abs() < 1e-15);
    }

    #[test_case(0.90 ; "ninety")]
    #[test_case(0.95 ; "ninety five")]
    #[test_case(0.99 ; "ninety nine")]
    fn test_es_at_least_var(confidence: f64) {
        let est = historical_estimate(&sample(), confidence).unwrap();
        assert!(est.expected_shortfall >= est.var);
    }

    #[test]
    fn test_nan_rejected() {
        let err = historical_var(&[0.01, f64::NAN], 0.95).unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput { .. }));
        assert!(historical_var(&[0.01, 0.02], 1.2).is_err());
    }
}
