//! Risk calculation configuration.

use serde::{Deserialize, Serialize};

use crate::returns::ReturnKind;
use crate::risk::{SimulationRequest, VarMethod};

/// Confidence levels every deployment must support.
pub const REQUIRED_CONFIDENCE_LEVELS: [f64; 3] = [0.90, 0.95, 0.99];

/// Risk calculation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Supported VaR confidence levels.
    #[serde(default = "default_confidence_levels")]
    pub confidence_levels: Vec<f64>,
    /// VaR horizon in trading days.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Return construction.
    #[serde(default)]
    pub return_kind: ReturnKind,
    /// Trading days per year, for annualized volatility.
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
    /// Monte Carlo defaults.
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    /// Method whose metrics are checked against VaR limits.
    #[serde(default = "default_monitor_method")]
    pub monitor_method: VarMethod,
    /// Confidence whose metrics are checked against VaR limits.
    #[serde(default = "default_monitor_confidence")]
    pub monitor_confidence: f64,
    /// Method used for stress tests.
    #[serde(default = "default_monitor_method")]
    pub stress_method: VarMethod,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            confidence_levels: default_confidence_levels(),
            horizon_days: default_horizon_days(),
            return_kind: ReturnKind::default(),
            trading_days_per_year: default_trading_days(),
            monte_carlo: MonteCarloConfig::default(),
            monitor_method: default_monitor_method(),
            monitor_confidence: default_monitor_confidence(),
            stress_method: default_monitor_method(),
        }
    }
}

/// Monte Carlo simulation defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Simulations per estimate.
    #[serde(default = "default_n_simulations")]
    pub n_simulations: usize,
    /// Draws per independently seeded batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Root seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            n_simulations: default_n_simulations(),
            batch_size: default_batch_size(),
            seed: default_seed(),
        }
    }
}

impl MonteCarloConfig {
    /// Simulation request for these defaults.
    #[must_use]
    pub const fn request(&self) -> SimulationRequest {
        SimulationRequest::new(self.n_simulations, self.seed).with_batch_size(self.batch_size)
    }
}

fn default_confidence_levels() -> Vec<f64> {
    REQUIRED_CONFIDENCE_LEVELS.to_vec()
}

const fn default_horizon_days() -> u32 {
    1
}

const fn default_trading_days() -> u32 {
    252
}

const fn default_monitor_method() -> VarMethod {
    VarMethod::Historical
}

const fn default_monitor_confidence() -> f64 {
    0.95
}

const fn default_n_simulations() -> usize {
    10_000
}

const fn default_batch_size() -> usize {
    2_500
}

const fn default_seed() -> u64 {
    42
}
