//! Risk metric value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RiskError, RiskResult};
use crate::models::CommodityId;

/// VaR methodology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    /// Empirical percentile of observed returns.
    Historical,
    /// Normal distribution fitted by sample mean and standard deviation.
    Parametric,
    /// Percentile of a simulated sample from the fitted distribution.
    MonteCarlo,
}

impl VarMethod {
    /// All methods, in reporting order.
    pub const ALL: [Self; 3] = [Self::Historical, Self::Parametric, Self::MonteCarlo];

    /// Stable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Parametric => "parametric",
            Self::MonteCarlo => "monte_carlo",
        }
    }
}

impl fmt::Display for VarMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a metric measures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "commodity", rename_all = "snake_case")]
pub enum MetricScope {
    /// Whole book.
    Portfolio,
    /// One commodity position.
    Commodity(CommodityId),
}

impl fmt::Display for MetricScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portfolio => f.write_str("portfolio"),
            Self::Commodity(id) => write!(f, "{id}"),
        }
    }
}

/// Unit of `var` and `expected_shortfall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// Fraction of position value (0.03 = 3% loss).
    Return,
    /// Currency amount.
    Currency,
}

/// VaR and Expected Shortfall from one calculation, as loss magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    /// Value at Risk.
    pub var: f64,
    /// Expected Shortfall (tail mean loss).
    pub expected_shortfall: f64,
}

impl VarEstimate {
    /// Both measures zero (degenerate distribution).
    pub const ZERO: Self = Self {
        var: 0.0,
        expected_shortfall: 0.0,
    };
}

/// Immutable snapshot of a computed risk measure.
///
/// Losses are positive: a VaR of 0.03 in [`MetricUnit::Return`] means a 3%
/// loss is not expected to be exceeded at the given confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetric {
    /// Methodology.
    pub method: VarMethod,
    /// Confidence level, e.g. 0.95.
    pub confidence: f64,
    /// Horizon in days.
    pub horizon_days: u32,
    /// Commodity or portfolio.
    pub scope: MetricScope,
    /// Unit of the loss figures.
    pub unit: MetricUnit,
    /// Value at Risk.
    pub var: f64,
    /// Expected Shortfall.
    pub expected_shortfall: f64,
    /// Observations the estimate is based on.
    pub observations: usize,
    /// When the metric was computed.
    pub computed_at: DateTime<Utc>,
    /// Stress scenario name, if stress-derived.
    pub scenario: Option<String>,
    /// Inputs included stale market data.
    pub stale: bool,
}

impl RiskMetric {
    /// Create a one-day, return-unit, unstressed metric.
    #[must_use]
    pub fn new(
        method: VarMethod,
        confidence: f64,
        scope: MetricScope,
        estimate: VarEstimate,
        observations: usize,
    ) -> Self {
        Self {
            method,
            confidence,
            horizon_days: 1,
            scope,
            unit: MetricUnit::Return,
            var: estimate.var,
            expected_shortfall: estimate.expected_shortfall,
            observations,
            computed_at: Utc::now(),
            scenario: None,
            stale: false,
        }
    }

    /// Set the unit without rescaling (figures already in that unit).
    #[must_use]
    pub const fn with_unit(mut self, unit: MetricUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Tag with the stress scenario it was derived under.
    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Flag stale inputs.
    #[must_use]
    pub const fn with_stale(mut self, stale: bool) -> Self {
        self.stale = self.stale || stale;
        self
    }

    /// Scale a one-day metric to `days` by the square-root-of-time rule.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero horizon.
    pub fn scaled_to_horizon(mut self, days: u32) -> RiskResult<Self> {
        if days == 0 {
            return Err(RiskError::invalid_input("horizon_days", "must be at least 1"));
        }
        if days != self.horizon_days {
            let factor = (f64::from(days) / f64::from(self.horizon_days)).sqrt();
            self.var *= factor;
            self.expected_shortfall *= factor;
            self.horizon_days = days;
        }
        Ok(self)
    }

    /// Convert a return-unit metric to currency for a position of `exposure`.
    ///
    /// The metric must already be measured on the position's P&L direction
    /// (negated returns for a short); only `|exposure|` is applied here.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the metric is already in currency or the
    /// exposure is not finite.
    pub fn in_currency(mut self, exposure: f64) -> RiskResult<Self> {
        if self.unit == MetricUnit::Currency {
            return Err(RiskError::invalid_input("unit", "metric is already in currency"));
        }
        if !exposure.is_finite() {
            return Err(RiskError::invalid_input("exposure", "must be finite"));
        }
        let notional = exposure.abs();
        self.var *= notional;
        self.expected_shortfall *= notional;
        self.unit = MetricUnit::Currency;
        Ok(self)
    }

    /// Whether this metric came from a stress scenario.
    #[must_use]
    pub const fn is_stressed(&self) -> bool {
        self.scenario.is_some()
    }

    /// Whether this metric matches a method/confidence pair.
    #[must_use]
    pub fn matches(&self, method: VarMethod, confidence: f64) -> bool {
        self.method == method && same_confidence(self.confidence, confidence)
    }
}

/// Compare confidence levels with tolerance for config round-off.
#[must_use]
pub fn same_confidence(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Validate a confidence level lies strictly between 0 and 1.
///
/// # Errors
///
/// Returns `InvalidInput` otherwise (including NaN).
pub fn validate_confidence(confidence: f64) -> RiskResult<()> {
    if confidence.is_finite() && confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(RiskError::invalid_input(
            "confidence",
            format!("must be in (0, 1), got {confidence}"),
        ))
    }
}
