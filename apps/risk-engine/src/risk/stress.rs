//! Stress scenarios and stressed VaR.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::calculator::series_estimate;
use super::metric::{MetricScope, MetricUnit, RiskMetric, VarEstimate, VarMethod};
use super::monte_carlo::SimulationRequest;
use super::portfolio::{PortfolioInputs, portfolio_estimate};
use crate::error::{RiskError, RiskResult};
use crate::models::CommodityId;
use crate::stats;

/// Named stress definition.
///
/// Each return's deviation from its mean is scaled by the volatility
/// multiplier, then the commodity's shock is added:
/// `r' = mean + (r - mean) * multiplier + shock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Historical period the scenario is modelled on.
    #[serde(default)]
    pub source_period: String,
    /// Volatility multiplier (σ' = σ × multiplier).
    #[serde(default = "default_multiplier")]
    pub volatility_multiplier: f64,
    /// Return shock applied to every commodity without an explicit shock.
    #[serde(default)]
    pub uniform_shock: Option<f64>,
    /// Explicit per-commodity return shocks.
    #[serde(default)]
    pub shocks: BTreeMap<CommodityId, f64>,
}

const fn default_multiplier() -> f64 {
    1.0
}

impl Scenario {
    /// Scenario with a multiplier and no shocks.
    #[must_use]
    pub fn new(name: impl Into<String>, volatility_multiplier: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            source_period: String::new(),
            volatility_multiplier,
            uniform_shock: None,
            shocks: BTreeMap::new(),
        }
    }

    /// Set the description and source period.
    #[must_use]
    pub fn described(mut self, description: impl Into<String>, source_period: impl Into<String>) -> Self {
        self.description = description.into();
        self.source_period = source_period.into();
        self
    }

    /// Shock every commodity without an explicit shock.
    #[must_use]
    pub const fn with_uniform_shock(mut self, shock: f64) -> Self {
        self.uniform_shock = Some(shock);
        self
    }

    /// Shock one commodity.
    #[must_use]
    pub fn with_shock(mut self, commodity: impl Into<CommodityId>, shock: f64) -> Self {
        self.shocks.insert(commodity.into(), shock);
        self
    }

    /// The built-in crisis scenarios.
    #[must_use]
    pub fn builtins() -> Vec<Self> {
        vec![
            Self::new("2008_crisis", 2.5)
                .described("Global financial crisis commodity sell-off", "2008-09/2009-03")
                .with_uniform_shock(-0.15),
            Self::new("covid_2020", 3.0)
                .described("Pandemic demand shock", "2020-02/2020-04")
                .with_uniform_shock(-0.25),
            Self::new("ukraine_conflict", 2.0)
                .described("Black Sea grain supply disruption", "2022-02/2022-06")
                .with_uniform_shock(-0.12),
        ]
    }

    /// Check the scenario parameters.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an empty name, a non-positive or
    /// non-finite multiplier, or a non-finite shock.
    pub fn validate(&self) -> RiskResult<()> {
        if self.name.trim().is_empty() {
            return Err(RiskError::configuration("scenario name must not be empty"));
        }
        if !self.volatility_multiplier.is_finite() || self.volatility_multiplier <= 0.0 {
            return Err(RiskError::configuration(format!(
                "scenario '{}': volatility_multiplier must be positive, got {}",
                self.name, self.volatility_multiplier
            )));
        }
        let mut shocks = self.uniform_shock.iter().chain(self.shocks.values());
        if let Some(bad) = shocks.find(|s| !s.is_finite()) {
            return Err(RiskError::configuration(format!(
                "scenario '{}': shock {bad} is not finite",
                self.name
            )));
        }
        Ok(())
    }

    /// Shock applied to `commodity` (explicit, else uniform, else 0).
    #[must_use]
    pub fn shock_for(&self, commodity: Option<&CommodityId>) -> f64 {
        commodity
            .and_then(|c| self.shocks.get(c).copied())
            .or(self.uniform_shock)
            .unwrap_or(0.0)
    }

    /// Whether the scenario leaves `commodity`'s returns unchanged.
    #[must_use]
    pub fn is_identity_for(&self, commodity: Option<&CommodityId>) -> bool {
        self.volatility_multiplier == 1.0 && self.shock_for(commodity) == 0.0
    }

    /// Apply the scenario to one return series.
    ///
    /// An identity transform returns the input untouched, so unstressed
    /// figures are reproduced bit for bit.
    #[must_use]
    pub fn apply(&self, commodity: Option<&CommodityId>, returns: &[f64]) -> Vec<f64> {
        if self.is_identity_for(commodity) {
            return returns.to_vec();
        }
        let mean = stats::mean(returns);
        let shock = self.shock_for(commodity);
        returns
            .iter()
            .map(|r| mean + (r - mean) * self.volatility_multiplier + shock)
            .collect()
    }
}

/// What to stress.
#[derive(Debug, Clone, Copy)]
pub enum StressInput<'a> {
    /// A single return series, optionally tagged with its commodity.
    Series {
        /// Commodity whose shock applies. `None` marks a whole-portfolio
        /// return series and uses the uniform shock.
        commodity: Option<&'a CommodityId>,
        /// Base returns.
        returns: &'a [f64],
    },
    /// A portfolio of exposures over aligned returns.
    Portfolio(PortfolioInputs<'a>),
}

/// Recompute VaR and ES under a stress scenario.
///
/// Series results are in return units; portfolio results in currency. For
/// the parametric portfolio path the deterministic shock P&L `w · shock` is
/// added to the loss, since that path carries no mean.
///
/// # Errors
///
/// - `Configuration` for an invalid scenario or simulation request.
/// - Any error of the underlying VaR method.
pub fn stress_test(
    input: StressInput<'_>,
    scenario: &Scenario,
    confidence: f64,
    method: VarMethod,
    simulation: &SimulationRequest,
    cancel: Option<&CancellationToken>,
) -> RiskResult<RiskMetric> {
    scenario.validate()?;

    let (scope, unit, observations, estimate) = match input {
        StressInput::Series { commodity, returns } => {
            let stressed = scenario.apply(commodity, returns);
            let estimate = series_estimate(&stressed, confidence, method, simulation, cancel)?;
            let scope = commodity.map_or(MetricScope::Portfolio, |c| MetricScope::Commodity(c.clone()));
            (scope, MetricUnit::Return, returns.len(), estimate)
        }
        StressInput::Portfolio(inputs) => {
            inputs.validate()?;
            let commodities = inputs.returns.commodities();
            let columns = inputs
                .returns
                .columns()
                .iter()
                .zip(commodities)
                .map(|(column, c)| scenario.apply(Some(c), column))
                .collect();
            let stressed = inputs.returns.with_columns(columns)?;
            let stressed_inputs = PortfolioInputs::new(inputs.exposures, &stressed, inputs.correlation);
            let mut estimate = portfolio_estimate(&stressed_inputs, confidence, method, simulation, cancel)?;

            if method == VarMethod::Parametric {
                let shock_pnl: f64 = inputs
                    .exposures
                    .iter()
                    .zip(commodities)
                    .map(|(w, c)| w * scenario.shock_for(Some(c)))
                    .sum();
                estimate = VarEstimate {
                    var: estimate.var - shock_pnl,
                    expected_shortfall: estimate.expected_shortfall - shock_pnl,
                };
            }
            (
                MetricScope::Portfolio,
                MetricUnit::Currency,
                inputs.returns.n_observations(),
                estimate,
            )
        }
    };

    debug!(
        scenario = %scenario.name,
        %method,
        confidence,
        var = estimate.var,
        "Stress test complete"
    );

    Ok(RiskMetric::new(method, confidence, scope, estimate, observations)
        .with_unit(unit)
        .with_scenario(scenario.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::returns::{CorrelationMatrix, ReturnMatrix};
    use crate::risk::historical::historical_var;
    use test_case::test_case;

    fn returns() -> Vec<f64> {
        (0..40).map(|i| 0.015 * (f64::from(i) * 0.9).cos() + 0.0002).collect()
    }

    fn request() -> SimulationRequest {
        SimulationRequest::new(2_000, 5)
    }

    #[test_case(VarMethod::Historical ; "historical")]
    #[test_case(VarMethod::Parametric ; "parametric")]
    #[test_case(VarMethod::MonteCarlo ; "monte carlo")]
    fn test_identity_scenario_reproduces_unstressed(method: VarMethod) {
        let r = returns();
        let base = series_estimate(&r, 0.95, method, &request(), None).unwrap();
        let stressed = stress_test(
            StressInput::Series {
                commodity: None,
                returns: &r,
            },
            &Scenario::new("flat", 1.0),
            0.95,
            method,
            &request(),
            None,
        )
        .unwrap();
        assert_eq!(stressed.var.to_bits(), base.var.to_bits());
        assert_eq!(stressed.scenario.as_deref(), Some("flat"));
    }

    #[test]
    fn test_builtins_increase_loss() {
        let r = returns();
        let base = historical_var(&r, 0.95).unwrap();
        for scenario in Scenario::builtins() {
            scenario.validate().unwrap();
            let m = stress_test(
                StressInput::Series {
                    commodity: None,
                    returns: &r,
                },
                &scenario,
                0.95,
                VarMethod::Historical,
                &request(),
                None,
            )
            .unwrap();
            assert!(m.var > base, "{} did not increase VaR", scenario.name);
            assert!(m.is_stressed());
        }
    }

    #[test]
    fn test_multiplier_scales_deviation() {
        let s = Scenario::new("double", 2.0);
        let out = s.apply(None, &[0.0, 0.02]);
        assert!((out[0] - -0.01).abs() < 1e-15);
        assert!((out[1] - 0.03).abs() < 1e-15);
    }

    #[test]
    fn test_explicit_shock_overrides_uniform() {
        let corn = CommodityId::new("corn");
        let s = Scenario::new("drought", 1.0)
            .with_uniform_shock(-0.05)
            .with_shock("corn", -0.20);
        assert_eq!(s.shock_for(Some(&corn)), -0.20);
        assert_eq!(s.shock_for(Some(&CommodityId::new("wheat"))), -0.05);
        assert_eq!(s.shock_for(None), -0.05);
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        let err = Scenario::new("broken", 0.0).validate().unwrap_err();
        assert!(matches!(err, RiskError::Configuration(_)));
    }

    #[test]
    fn test_portfolio_parametric_includes_shock() {
        let m = ReturnMatrix::new(
            vec![CommodityId::new("corn"), CommodityId::new("wheat")],
            vec![returns(), returns().iter().map(|r| r * 0.5).collect()],
        )
        .unwrap();
        let rho = CorrelationMatrix::estimate(&m);
        let exposures = [1_000.0, 2_000.0];
        let inputs = PortfolioInputs::new(&exposures, &m, &rho);
        let base = portfolio_estimate(&inputs, 0.95, VarMethod::Parametric, &request(), None).unwrap();
        let shocked = stress_test(
            StressInput::Portfolio(inputs),
            &Scenario::new("shock", 1.0).with_uniform_shock(-0.10),
            0.95,
            VarMethod::Parametric,
            &request(),
            None,
        )
        .unwrap();
        assert_eq!(shocked.unit, MetricUnit::Currency);
        assert!((shocked.var - (base.var + 300.0)).abs() < 1e-6);
    }
}
