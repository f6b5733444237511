//! Single-commodity return series.

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::models::{CommodityId, PriceSeries};

/// How returns are derived from consecutive prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// `(p[i] - p[i-1]) / p[i-1]`.
    #[default]
    Simple,
    /// `ln(p[i] / p[i-1])`.
    Log,
}

/// Returns derived from a price series; one shorter than its prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    kind: ReturnKind,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Wrap already-computed returns (e.g. a portfolio P&L path).
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any value is NaN or infinite.
    pub fn from_values(kind: ReturnKind, values: Vec<f64>) -> RiskResult<Self> {
        crate::stats::ensure_finite("returns", &values)?;
        Ok(Self { kind, values })
    }

    /// Return kind.
    #[must_use]
    pub const fn kind(&self) -> ReturnKind {
        self.kind
    }

    /// Return values in time order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of returns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no returns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume into the raw values.
    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Derive returns from a raw price sequence.
///
/// # Errors
///
/// - `InsufficientData` for fewer than two prices.
/// - `InvalidPrice` for NaN/infinite prices, for non-positive prices under
///   [`ReturnKind::Log`], and for a zero price used as a simple-return base.
pub fn compute_returns(prices: &[f64], kind: ReturnKind) -> RiskResult<ReturnSeries> {
    if prices.len() < 2 {
        return Err(RiskError::insufficient("returns", 2, prices.len()));
    }

    for (index, &price) in prices.iter().enumerate() {
        let invalid = !price.is_finite()
            || match kind {
                ReturnKind::Log => price <= 0.0,
                // Only a base price divides; the last price may be anything finite.
                ReturnKind::Simple => price == 0.0 && index + 1 < prices.len(),
            };
        if invalid {
            return Err(RiskError::InvalidPrice { index, price });
        }
    }

    let values = prices
        .windows(2)
        .map(|w| match kind {
            ReturnKind::Simple => (w[1] - w[0]) / w[0],
            ReturnKind::Log => (w[1] / w[0]).ln(),
        })
        .collect();

    Ok(ReturnSeries { kind, values })
}

/// Derive returns from a commodity's price history.
///
/// # Errors
///
/// Same as [`compute_returns`].
pub fn returns_for(series: &PriceSeries, kind: ReturnKind) -> RiskResult<(CommodityId, ReturnSeries)> {
    let returns = compute_returns(&series.prices(), kind)?;
    Ok((series.commodity().clone(), returns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_simple_returns() {
        let r = compute_returns(&[100.0, 110.0, 99.0], ReturnKind::Simple).unwrap();
        assert_eq!(r.len(), 2);
        assert!((r.values()[0] - 0.10).abs() < 1e-12);
        assert!((r.values()[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_log_returns() {
        let r = compute_returns(&[100.0, 110.0], ReturnKind::Log).unwrap();
        assert!((r.values()[0] - (1.1_f64).ln()).abs() < 1e-12);
    }

    #[test_case(&[] ; "empty")]
    #[test_case(&[4.5] ; "single")]
    fn test_insufficient_prices(prices: &[f64]) {
        let err = compute_returns(prices, ReturnKind::Simple).unwrap_err();
        assert!(matches!(err, RiskError::InsufficientData { required: 2, .. }));
    }

    #[test]
    fn test_nan_price_rejected() {
        let err = compute_returns(&[4.5, f64::NAN, 4.7], ReturnKind::Simple).unwrap_err();
        assert!(matches!(err, RiskError::InvalidPrice { index: 1, .. }));
    }

    #[test]
    fn test_non_positive_price_rejected_for_log() {
        let err = compute_returns(&[4.5, 0.0], ReturnKind::Log).unwrap_err();
        assert!(matches!(err, RiskError::InvalidPrice { index: 1, .. }));
        assert!(compute_returns(&[4.5, -1.0], ReturnKind::Log).is_err());
    }

    #[test]
    fn test_zero_base_rejected_for_simple() {
        let err = compute_returns(&[0.0, 4.5], ReturnKind::Simple).unwrap_err();
        assert!(matches!(err, RiskError::InvalidPrice { index: 0, .. }));
        // A zero final print is a -100% return, not a division by zero.
        let r = compute_returns(&[4.5, 0.0], ReturnKind::Simple).unwrap();
        assert!((r.values()[0] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let prices = [3.0, 3.3, 3.1, 3.6];
        let a = compute_returns(&prices, ReturnKind::Log).unwrap();
        let b = compute_returns(&prices, ReturnKind::Log).unwrap();
        assert_eq!(a, b);
    }
}
