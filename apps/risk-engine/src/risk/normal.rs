//! Standard normal distribution functions.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::{RiskError, RiskResult};

/// N(0, 1).
///
/// # Errors
///
/// Returns `InvalidInput` if the distribution cannot be constructed.
pub fn standard_normal() -> RiskResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| RiskError::invalid_input("normal", e.to_string()))
}

/// Standard normal CDF.
///
/// # Errors
///
/// Same as [`standard_normal`].
pub fn norm_cdf(x: f64) -> RiskResult<f64> {
    Ok(standard_normal()?.cdf(x))
}

/// Standard normal PDF.
///
/// # Errors
///
/// Same as [`standard_normal`].
pub fn norm_pdf(x: f64) -> RiskResult<f64> {
    Ok(standard_normal()?.pdf(x))
}

/// Inverse standard normal CDF (quantile function).
///
/// Returns ±infinity at 0 and 1.
///
/// # Errors
///
/// Returns `InvalidInput` for `p` outside [0, 1] or NaN.
pub fn inverse_norm_cdf(p: f64) -> RiskResult<f64> {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return Err(RiskError::invalid_input(
            "probability",
            format!("must lie in [0, 1], got {p}"),
        ));
    }
    Ok(standard_normal()?.inverse_cdf(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0).unwrap() - 0.5).abs() < 1e-12);
        assert!((norm_cdf(1.96).unwrap() - 0.975).abs() < 1e-4);
    }

    #[test_case(0.90, 1.281_551_565_545 ; "ninety")]
    #[test_case(0.95, 1.644_853_626_951 ; "ninety five")]
    #[test_case(0.99, 2.326_347_874_041 ; "ninety nine")]
    #[test_case(0.5, 0.0 ; "median")]
    fn test_inverse_known_quantiles(p: f64, expected: f64) {
        assert!((inverse_norm_cdf(p).unwrap() - expected).abs() < 1e-9);
        assert!((inverse_norm_cdf(1.0 - p).unwrap() + expected).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_round_trips_in_tails() {
        for p in [1e-6, 0.001, 0.01, 0.02, 0.3, 0.7, 0.98, 0.999] {
            let x = inverse_norm_cdf(p).unwrap();
            assert!((norm_cdf(x).unwrap() - p).abs() < 1e-10);
        }
    }

    #[test]
    fn test_inverse_bounds() {
        assert_eq!(inverse_norm_cdf(0.0).unwrap(), f64::NEG_INFINITY);
        assert_eq!(inverse_norm_cdf(1.0).unwrap(), f64::INFINITY);
        assert!(inverse_norm_cdf(1.5).is_err());
        assert!(inverse_norm_cdf(f64::NAN).is_err());
    }

    #[test]
    fn test_pdf_peak() {
        assert!((norm_pdf(0.0).unwrap() - 0.398_942_280_401).abs() < 1e-10);
    }
}
