//! Limit identifiers and configured thresholds.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::CommodityId;

/// A monitored limit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "commodity", rename_all = "snake_case")]
pub enum LimitId {
    /// Whole-portfolio VaR.
    PortfolioVar,
    /// VaR of one commodity position.
    CommodityVar(CommodityId),
    /// Absolute market value of one commodity position.
    PositionSize(CommodityId),
}

impl LimitId {
    /// Escalation severity of a breach of this limit.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::PortfolioVar | Self::PositionSize(_) => Severity::High,
            Self::CommodityVar(_) => Severity::Medium,
        }
    }

    /// Commodity the limit applies to, if any.
    #[must_use]
    pub const fn commodity(&self) -> Option<&CommodityId> {
        match self {
            Self::PortfolioVar => None,
            Self::CommodityVar(c) | Self::PositionSize(c) => Some(c),
        }
    }
}

impl fmt::Display for LimitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortfolioVar => f.write_str("portfolio_var"),
            Self::CommodityVar(c) => write!(f, "commodity_var:{c}"),
            Self::PositionSize(c) => write!(f, "position_size:{c}"),
        }
    }
}

/// Breach severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Review at next opportunity.
    Medium,
    /// Immediate attention.
    High,
}

/// Configured risk limits, in currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Portfolio VaR limit.
    #[serde(default = "default_portfolio_var")]
    pub portfolio_var: f64,
    /// VaR limit for commodities without an override.
    #[serde(default = "default_commodity_var")]
    pub default_commodity_var: f64,
    /// Per-commodity VaR overrides.
    #[serde(default)]
    pub commodity_var: BTreeMap<CommodityId, f64>,
    /// Per-commodity position size limits; unlisted commodities are unlimited.
    #[serde(default = "default_position_limits")]
    pub position_size: BTreeMap<CommodityId, f64>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            portfolio_var: default_portfolio_var(),
            default_commodity_var: default_commodity_var(),
            commodity_var: BTreeMap::new(),
            position_size: default_position_limits(),
        }
    }
}

impl RiskLimits {
    /// VaR limit for a commodity.
    #[must_use]
    pub fn commodity_var_limit(&self, commodity: &CommodityId) -> f64 {
        self.commodity_var
            .get(commodity)
            .copied()
            .unwrap_or(self.default_commodity_var)
    }

    /// Every limit to evaluate for `commodities`, with its threshold.
    ///
    /// Portfolio VaR first, then per commodity: VaR, and position size where
    /// configured.
    #[must_use]
    pub fn table<'a>(&self, commodities: impl IntoIterator<Item = &'a CommodityId>) -> Vec<(LimitId, f64)> {
        let mut table = vec![(LimitId::PortfolioVar, self.portfolio_var)];
        for commodity in commodities {
            table.push((
                LimitId::CommodityVar(commodity.clone()),
                self.commodity_var_limit(commodity),
            ));
            if let Some(limit) = self.position_size.get(commodity) {
                table.push((LimitId::PositionSize(commodity.clone()), *limit));
            }
        }
        table
    }

    /// Names of limits that are not positive finite amounts.
    #[must_use]
    pub fn invalid_entries(&self) -> Vec<String> {
        let mut invalid = Vec::new();
        let mut check = |name: String, value: f64| {
            if !value.is_finite() || value <= 0.0 {
                invalid.push(format!("{name} = {value}"));
            }
        };
        check("portfolio_var".to_string(), self.portfolio_var);
        check("default_commodity_var".to_string(), self.default_commodity_var);
        for (c, v) in &self.commodity_var {
            check(format!("commodity_var.{c}"), *v);
        }
        for (c, v) in &self.position_size {
            check(format!("position_size.{c}"), *v);
        }
        invalid
    }
}

const fn default_portfolio_var() -> f64 {
    3_000_000.0
}

const fn default_commodity_var() -> f64 {
    1_200_000.0
}

fn default_position_limits() -> BTreeMap<CommodityId, f64> {
    [
        ("Corn", 50.0),
        ("Wheat", 40.0),
        ("Soybeans", 60.0),
        ("Sugar", 30.0),
        ("Coffee", 35.0),
        ("Cotton", 25.0),
        ("Cocoa", 20.0),
        ("Rice", 15.0),
    ]
    .into_iter()
    .map(|(c, millions)| (CommodityId::new(c), millions * 1_000_000.0))
    .collect()
}
