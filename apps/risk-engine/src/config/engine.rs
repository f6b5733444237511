//! Book, market data and pass scheduling configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market_data::SyntheticSettings;
use crate::portfolio::ExposureConvention;

/// Position book configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// How positions contribute to total value and exposures.
    #[serde(default)]
    pub exposure_convention: ExposureConvention,
    /// Starting cash balance.
    #[serde(default)]
    pub cash: Decimal,
    /// Seed the book with the built-in sample trades.
    #[serde(default = "default_use_sample")]
    pub use_sample: bool,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            exposure_convention: ExposureConvention::default(),
            cash: Decimal::ZERO,
            use_sample: default_use_sample(),
        }
    }
}

/// Market data configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Price observations requested per commodity.
    #[serde(default = "default_history_days")]
    pub history_days: usize,
    /// Synthetic generator used by the binary.
    #[serde(default)]
    pub synthetic: SyntheticSettings,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            history_days: default_history_days(),
            synthetic: SyntheticSettings::default(),
        }
    }
}

/// Monitoring pass configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// 95% commodity VaR above which a concentration is reported.
    #[serde(default = "default_concentration_var")]
    pub concentration_var: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            concentration_var: default_concentration_var(),
        }
    }
}

const fn default_use_sample() -> bool {
    true
}

const fn default_history_days() -> usize {
    252
}

const fn default_interval_secs() -> u64 {
    60
}

const fn default_concentration_var() -> f64 {
    5_000_000.0
}
