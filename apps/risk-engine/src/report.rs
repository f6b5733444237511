//! Risk report assembled from one monitoring pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::models::CommodityId;
use crate::monitor::AlertState;
use crate::portfolio::PortfolioSummary;
use crate::risk::{MetricScope, MetricUnit, RiskMetric, Scenario, VarMethod};

/// Confidence of the "95" report columns.
pub const REPORT_CONFIDENCE_LOW: f64 = 0.95;
/// Confidence of the "99" report columns.
pub const REPORT_CONFIDENCE_HIGH: f64 = 0.99;

/// Headline VaR and ES in currency and as a fraction of the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFigures {
    /// VaR at 95%.
    pub var_95: f64,
    /// VaR at 99%.
    pub var_99: f64,
    /// ES at 95%.
    pub es_95: f64,
    /// ES at 99%.
    pub es_99: f64,
    /// `var_95` over the position value.
    pub var_95_pct: f64,
    /// `var_99` over the position value.
    pub var_99_pct: f64,
    /// `es_95` over the position value.
    pub es_95_pct: f64,
    /// `es_99` over the position value.
    pub es_99_pct: f64,
    /// Annualized volatility of returns.
    pub volatility: f64,
    /// Inputs included stale data.
    pub stale: bool,
}

impl RiskFigures {
    /// Pick the 95% and 99% unstressed currency metrics of `method` for
    /// `scope`. `None` unless both are present.
    #[must_use]
    pub fn from_metrics(
        metrics: &[RiskMetric],
        scope: &MetricScope,
        method: VarMethod,
        position_value: f64,
        volatility: f64,
    ) -> Option<Self> {
        let find = |confidence: f64| {
            metrics.iter().find(|m| {
                &m.scope == scope
                    && m.unit == MetricUnit::Currency
                    && !m.is_stressed()
                    && m.matches(method, confidence)
            })
        };
        let low = find(REPORT_CONFIDENCE_LOW)?;
        let high = find(REPORT_CONFIDENCE_HIGH)?;
        let pct = |amount: f64| {
            if position_value.abs() > 0.0 {
                amount / position_value.abs()
            } else {
                0.0
            }
        };
        Some(Self {
            var_95: low.var,
            var_99: high.var,
            es_95: low.expected_shortfall,
            es_99: high.expected_shortfall,
            var_95_pct: pct(low.var),
            var_99_pct: pct(high.var),
            es_95_pct: pct(low.expected_shortfall),
            es_99_pct: pct(high.expected_shortfall),
            volatility,
            stale: low.stale || high.stale,
        })
    }
}

/// Risk of one commodity position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityRisk {
    /// Commodity.
    pub commodity: CommodityId,
    /// Absolute position value.
    pub position_value: f64,
    /// Headline figures.
    pub figures: RiskFigures,
}

/// Portfolio VaR under one stress scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    /// Scenario name.
    pub scenario: String,
    /// Human-readable description.
    pub description: String,
    /// Historical period the scenario is modeled on.
    pub source_period: String,
    /// Volatility multiplier applied.
    pub volatility_multiplier: f64,
    /// Stressed VaR at 95%, in currency.
    pub stressed_var_95: f64,
    /// Stressed VaR at 99%, in currency.
    pub stressed_var_99: f64,
    /// Stressed ES at 99%, in currency.
    pub stressed_es_99: f64,
}

impl StressResult {
    /// Collect the stressed metrics of `scenario`.
    #[must_use]
    pub fn from_metrics(scenario: &Scenario, metrics: &[RiskMetric]) -> Option<Self> {
        let find = |confidence: f64| {
            metrics.iter().find(|m| {
                m.scenario.as_deref() == Some(scenario.name.as_str())
                    && (m.confidence - confidence).abs() < 1e-9
            })
        };
        let low = find(REPORT_CONFIDENCE_LOW)?;
        let high = find(REPORT_CONFIDENCE_HIGH)?;
        Some(Self {
            scenario: scenario.name.clone(),
            description: scenario.description.clone(),
            source_period: scenario.source_period.clone(),
            volatility_multiplier: scenario.volatility_multiplier,
            stressed_var_95: low.var,
            stressed_var_99: high.var,
            stressed_es_99: high.expected_shortfall,
        })
    }
}

/// A calculation that failed and was left out of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationFailure {
    /// What was being computed.
    pub operation: String,
    /// Stable error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl CalculationFailure {
    /// Record `error` for `operation`.
    #[must_use]
    pub fn new(operation: impl Into<String>, error: &RiskError) -> Self {
        Self {
            operation: operation.into(),
            code: error.code().reason().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result of one monitoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    /// When the pass finished.
    pub generated_at: DateTime<Utc>,
    /// Book at evaluation time.
    pub portfolio: PortfolioSummary,
    /// Portfolio headline figures, if computable.
    pub portfolio_risk: Option<RiskFigures>,
    /// Per-commodity headline figures, in commodity order.
    pub commodity_risk: Vec<CommodityRisk>,
    /// Portfolio VaR per stress scenario.
    pub stress_results: Vec<StressResult>,
    /// Every metric computed this pass.
    pub metrics: Vec<RiskMetric>,
    /// Full alert snapshot.
    pub alerts: Vec<AlertState>,
    /// Breached limits.
    pub breaches: Vec<AlertState>,
    /// Suggested actions.
    pub recommendations: Vec<String>,
    /// Calculations skipped this pass.
    pub failures: Vec<CalculationFailure>,
}

impl RiskReport {
    /// Whether any limit is breached.
    #[must_use]
    pub fn has_breaches(&self) -> bool {
        !self.breaches.is_empty()
    }

    /// Figures for one commodity.
    #[must_use]
    pub fn commodity(&self, commodity: &CommodityId) -> Option<&CommodityRisk> {
        self.commodity_risk.iter().find(|c| &c.commodity == commodity)
    }

    /// Result for one stress scenario.
    #[must_use]
    pub fn stress(&self, scenario: &str) -> Option<&StressResult> {
        self.stress_results.iter().find(|s| s.scenario == scenario)
    }
}

/// Breach count above which rebalancing is suggested.
const REBALANCE_BREACH_COUNT: usize = 3;

/// Suggested actions for a set of breaches and commodity figures.
///
/// Any breach asks for immediate attention; more than three suggest
/// rebalancing; a commodity whose 95% VaR exceeds `concentration_var` is
/// flagged as a concentration.
#[must_use]
pub fn recommendations(
    breaches: &[AlertState],
    commodity_risk: &[CommodityRisk],
    concentration_var: f64,
) -> Vec<String> {
    let mut out = Vec::new();
    if !breaches.is_empty() {
        out.push("Immediate attention required due to limit breaches".to_string());
    }
    if breaches.len() > REBALANCE_BREACH_COUNT {
        out.push("Consider portfolio rebalancing".to_string());
    }
    out.extend(
        commodity_risk
            .iter()
            .filter(|c| c.figures.var_95 > concentration_var)
            .map(|c| format!("High risk concentration in {}", c.commodity)),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{LimitId, Observation, advance};
    use crate::risk::VarEstimate;

    fn currency_metric(scope: MetricScope, confidence: f64, var: f64) -> RiskMetric {
        RiskMetric::new(
            VarMethod::Historical,
            confidence,
            scope,
            VarEstimate {
                var,
                expected_shortfall: var * 1.25,
            },
            250,
        )
        .with_unit(MetricUnit::Currency)
    }

    fn breach() -> AlertState {
        advance(
            None,
            &LimitId::PortfolioVar,
            1.0,
            Observation::Value {
                value: 2.0,
                stale: false,
            },
            Utc::now(),
        )
        .0
    }

    fn commodity(name: &str, var_95: f64) -> CommodityRisk {
        let metrics = [
            currency_metric(MetricScope::Commodity(CommodityId::new(name)), 0.95, var_95),
            currency_metric(MetricScope::Commodity(CommodityId::new(name)), 0.99, var_95 * 1.4),
        ];
        CommodityRisk {
            commodity: CommodityId::new(name),
            position_value: 100e6,
            figures: RiskFigures::from_metrics(
                &metrics,
                &MetricScope::Commodity(CommodityId::new(name)),
                VarMethod::Historical,
                100e6,
                0.2,
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_figures_percentages() {
        let risk = commodity("corn", 2e6);
        assert_eq!(risk.figures.var_95_pct, 0.02);
        assert_eq!(risk.figures.es_95, 2.5e6);
    }

    #[test]
    fn test_figures_require_both_levels() {
        let metrics = [currency_metric(MetricScope::Portfolio, 0.95, 1.0)];
        let figures =
            RiskFigures::from_metrics(&metrics, &MetricScope::Portfolio, VarMethod::Historical, 1.0, 0.0);
        assert!(figures.is_none());
    }

    #[test]
    fn test_no_recommendations_when_quiet() {
        assert!(recommendations(&[], &[commodity("corn", 1e6)], 5e6).is_empty());
    }

    #[test]
    fn test_recommendation_rules() {
        let breaches = vec![breach(); 4];
        let recs = recommendations(&breaches, &[commodity("corn", 6e6), commodity("rice", 1e6)], 5e6);
        assert_eq!(
            recs,
            vec![
                "Immediate attention required due to limit breaches".to_string(),
                "Consider portfolio rebalancing".to_string(),
                "High risk concentration in CORN".to_string(),
            ]
        );
    }

    #[test]
    fn test_stress_result_lookup() {
        let scenario = Scenario::builtins().into_iter().next().unwrap();
        let metrics = [
            currency_metric(MetricScope::Portfolio, 0.95, 3e6).with_scenario(scenario.name.clone()),
            currency_metric(MetricScope::Portfolio, 0.99, 5e6).with_scenario(scenario.name.clone()),
        ];
        let result = StressResult::from_metrics(&scenario, &metrics).unwrap();
        assert_eq!(result.stressed_var_99, 5e6);
        assert_eq!(result.volatility_multiplier, scenario.volatility_multiplier);
    }
}
