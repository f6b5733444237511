//! Risk calculator facade.
//!
//! Wraps the pure VaR functions with the configured confidence levels,
//! horizon and Monte Carlo defaults, and produces [`RiskMetric`] snapshots.

use tokio_util::sync::CancellationToken;

use super::historical::historical_estimate;
use super::metric::{
    MetricScope, MetricUnit, RiskMetric, VarEstimate, VarMethod, same_confidence,
    validate_confidence,
};
use super::monte_carlo::{SimulationRequest, monte_carlo_estimate};
use super::parametric::parametric_estimate;
use super::portfolio::{PortfolioInputs, portfolio_estimate};
use super::stress::{Scenario, StressInput, stress_test};
use crate::config::{REQUIRED_CONFIDENCE_LEVELS, RiskConfig};
use crate::error::{RiskError, RiskResult};
use crate::models::CommodityId;
use crate::stats;

/// VaR and ES of a single return series by `method`.
///
/// `simulation` is used only by [`VarMethod::MonteCarlo`].
///
/// # Errors
///
/// Any error of the selected method.
pub fn series_estimate(
    returns: &[f64],
    confidence: f64,
    method: VarMethod,
    simulation: &SimulationRequest,
    cancel: Option<&CancellationToken>,
) -> RiskResult<VarEstimate> {
    match method {
        VarMethod::Historical => historical_estimate(returns, confidence),
        VarMethod::Parametric => parametric_estimate(returns, confidence),
        VarMethod::MonteCarlo => monte_carlo_estimate(returns, confidence, simulation, cancel),
    }
}

/// Configured risk calculator.
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    config: RiskConfig,
}

impl RiskCalculator {
    /// Create a calculator.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a required confidence level is missing, a
    /// level lies outside (0, 1), the horizon is zero or the Monte Carlo
    /// defaults are below the simulation floor.
    pub fn new(config: RiskConfig) -> RiskResult<Self> {
        for level in &config.confidence_levels {
            validate_confidence(*level).map_err(|e| RiskError::configuration(e.to_string()))?;
        }
        for required in REQUIRED_CONFIDENCE_LEVELS {
            if !config.confidence_levels.iter().any(|c| same_confidence(*c, required)) {
                return Err(RiskError::configuration(format!(
                    "confidence_levels must include {required}"
                )));
            }
        }
        if config.horizon_days == 0 {
            return Err(RiskError::configuration("horizon_days must be at least 1"));
        }
        config.monte_carlo.request().validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Default simulation request.
    #[must_use]
    pub const fn simulation(&self) -> SimulationRequest {
        self.config.monte_carlo.request()
    }

    /// Check a confidence level is valid and configured.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` outside (0, 1).
    /// - `Configuration` for a level not in the configured set.
    pub fn check_confidence(&self, confidence: f64) -> RiskResult<()> {
        validate_confidence(confidence)?;
        if self
            .config
            .confidence_levels
            .iter()
            .any(|c| same_confidence(*c, confidence))
        {
            Ok(())
        } else {
            Err(RiskError::configuration(format!(
                "unsupported confidence level {confidence}"
            )))
        }
    }

    /// Currency VaR metric for one commodity position.
    ///
    /// The estimate is computed on the position's return P&L (returns with
    /// the sign of `exposure`, so a short loses on price rises), scaled to
    /// the configured horizon and multiplied by the absolute exposure. This
    /// agrees with [`portfolio_estimate`] on a one-asset book.
    ///
    /// # Errors
    ///
    /// Any error of the selected method, or of [`Self::check_confidence`].
    pub fn commodity_metric(
        &self,
        commodity: &CommodityId,
        returns: &[f64],
        exposure: f64,
        method: VarMethod,
        confidence: f64,
        cancel: Option<&CancellationToken>,
    ) -> RiskResult<RiskMetric> {
        self.check_confidence(confidence)?;
        let direction = if exposure < 0.0 { -1.0 } else { 1.0 };
        let position_returns: Vec<f64> = returns.iter().map(|r| r * direction).collect();
        let estimate = series_estimate(&position_returns, confidence, method, &self.simulation(), cancel)?;
        RiskMetric::new(
            method,
            confidence,
            MetricScope::Commodity(commodity.clone()),
            estimate,
            returns.len(),
        )
        .scaled_to_horizon(self.config.horizon_days)?
        .in_currency(exposure)
    }

    /// Metrics for every method and configured confidence level.
    ///
    /// # Errors
    ///
    /// The first error of any method.
    pub fn commodity_metrics(
        &self,
        commodity: &CommodityId,
        returns: &[f64],
        exposure: f64,
        cancel: Option<&CancellationToken>,
    ) -> RiskResult<Vec<RiskMetric>> {
        let mut metrics = Vec::with_capacity(VarMethod::ALL.len() * self.config.confidence_levels.len());
        for method in VarMethod::ALL {
            for &confidence in &self.config.confidence_levels {
                metrics.push(self.commodity_metric(commodity, returns, exposure, method, confidence, cancel)?);
            }
        }
        Ok(metrics)
    }

    /// Currency VaR metric for the whole portfolio.
    ///
    /// # Errors
    ///
    /// Any error of [`portfolio_estimate`] or [`Self::check_confidence`].
    pub fn portfolio_metric(
        &self,
        inputs: &PortfolioInputs<'_>,
        method: VarMethod,
        confidence: f64,
        cancel: Option<&CancellationToken>,
    ) -> RiskResult<RiskMetric> {
        self.check_confidence(confidence)?;
        let estimate = portfolio_estimate(inputs, confidence, method, &self.simulation(), cancel)?;
        RiskMetric::new(
            method,
            confidence,
            MetricScope::Portfolio,
            estimate,
            inputs.returns.n_observations(),
        )
        .with_unit(MetricUnit::Currency)
        .scaled_to_horizon(self.config.horizon_days)
    }

    /// Metrics for every method and configured confidence level.
    ///
    /// # Errors
    ///
    /// The first error of any method.
    pub fn portfolio_metrics(
        &self,
        inputs: &PortfolioInputs<'_>,
        cancel: Option<&CancellationToken>,
    ) -> RiskResult<Vec<RiskMetric>> {
        let mut metrics = Vec::new();
        for method in VarMethod::ALL {
            for &confidence in &self.config.confidence_levels {
                metrics.push(self.portfolio_metric(inputs, method, confidence, cancel)?);
            }
        }
        Ok(metrics)
    }

    /// Stressed metric under the configured stress method.
    ///
    /// # Errors
    ///
    /// Any error of [`stress_test`] or [`Self::check_confidence`].
    pub fn stress(
        &self,
        input: StressInput<'_>,
        scenario: &Scenario,
        confidence: f64,
        cancel: Option<&CancellationToken>,
    ) -> RiskResult<RiskMetric> {
        self.check_confidence(confidence)?;
        stress_test(
            input,
            scenario,
            confidence,
            self.config.stress_method,
            &self.simulation(),
            cancel,
        )?
        .scaled_to_horizon(self.config.horizon_days)
    }

    /// Annualized volatility: sample σ × sqrt(trading days per year).
    #[must_use]
    pub fn annualized_volatility(&self, returns: &[f64]) -> f64 {
        stats::sample_std(returns) * f64::from(self.config.trading_days_per_year).sqrt()
    }
}
