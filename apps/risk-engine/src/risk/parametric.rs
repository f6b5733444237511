//! Variance-covariance (normal) VaR.

use super::metric::{VarEstimate, validate_confidence};
use super::normal::{inverse_norm_cdf, norm_pdf};
use crate::error::{RiskError, RiskResult};
use crate::stats;

/// Fitted normal parameters of a return sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalFit {
    /// Sample mean.
    pub mean: f64,
    /// Sample standard deviation (N-1).
    pub std_dev: f64,
    /// Sample size.
    pub observations: usize,
}

impl NormalFit {
    /// Fit mean and sample standard deviation.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` for fewer than two returns.
    /// - `InvalidInput` for non-finite returns.
    pub fn from_returns(statistic: &'static str, returns: &[f64]) -> RiskResult<Self> {
        if returns.len() < 2 {
            return Err(RiskError::insufficient(statistic, 2, returns.len()));
        }
        stats::ensure_finite("returns", returns)?;
        Ok(Self {
            mean: stats::mean(returns),
            std_dev: stats::sample_std(returns),
            observations: returns.len(),
        })
    }

    /// Whether the sample has no dispersion.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.std_dev == 0.0
    }
}

/// Lower-tail standard normal quantile for a confidence level.
///
/// `loss_quantile(0.95)` is about -1.645.
///
/// # Errors
///
/// Returns `InvalidInput` for a confidence outside (0, 1).
pub fn loss_quantile(confidence: f64) -> RiskResult<f64> {
    validate_confidence(confidence)?;
    inverse_norm_cdf(1.0 - confidence)
}

/// Parametric VaR: `-(mean + z * std_dev)` with `z` the loss-tail quantile.
///
/// A zero-variance series yields 0.
///
/// # Errors
///
/// - `InsufficientData` for fewer than two returns.
/// - `InvalidInput` for non-finite returns or a confidence outside (0, 1).
pub fn parametric_var(returns: &[f64], confidence: f64) -> RiskResult<f64> {
    parametric_estimate(returns, confidence).map(|e| e.var)
}

/// Parametric VaR with the closed-form normal Expected Shortfall.
///
/// # Errors
///
/// Same as [`parametric_var`].
pub fn parametric_estimate(returns: &[f64], confidence: f64) -> RiskResult<VarEstimate> {
    validate_confidence(confidence)?;
    let fit = NormalFit::from_returns("parametric_var", returns)?;
    normal_estimate(fit.mean, fit.std_dev, confidence)
}

/// VaR and ES of a normal P&L distribution.
///
/// ES is `std_dev * pdf(z) / (1 - confidence) - mean`.
pub(crate) fn normal_estimate(mean: f64, std_dev: f64, confidence: f64) -> RiskResult<VarEstimate> {
    if std_dev == 0.0 {
        return Ok(VarEstimate::ZERO);
    }
    let z = loss_quantile(confidence)?;
    Ok(VarEstimate {
        var: -(mean + z * std_dev),
        expected_shortfall: std_dev * norm_pdf(z)? / (1.0 - confidence) - mean,
    })
}
