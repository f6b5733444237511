//! Risk calculation.
//!
//! Value at Risk under three methodologies, Expected Shortfall, portfolio
//! aggregation over a correlation model, and stress tests. Every function is
//! pure given its inputs; VaR and ES are positive loss magnitudes.
//!
//! # Features
//!
//! - Historical simulation with interpolated empirical percentiles
//! - Parametric (normal) VaR with closed-form ES
//! - Seeded, batch-parallel Monte Carlo with cancellation
//! - Portfolio VaR over dollar exposures (variance-covariance, joint
//!   historical revaluation, Cholesky-correlated simulation)
//! - Stress scenarios: volatility multiplier plus per-commodity shocks
//!
//! # Example
//!
//! ```rust,ignore
//! use risk_engine::risk::{historical_var, expected_shortfall};
//!
//! let var = historical_var(&returns, 0.95)?;
//! let es = expected_shortfall(&returns, 0.95, var)?;
//! assert!(es >= var);
//! ```

mod calculator;
mod historical;
mod metric;
mod monte_carlo;
pub mod normal;
mod parametric;
mod portfolio;
mod stress;

pub use calculator::{RiskCalculator, series_estimate};
pub use historical::{expected_shortfall, historical_estimate, historical_var};
pub use metric::{
    MetricScope, MetricUnit, RiskMetric, VarEstimate, VarMethod, same_confidence,
    validate_confidence,
};
pub use monte_carlo::{
    DEFAULT_BATCH_SIZE, MIN_SIMULATIONS, SimulationRequest, batch_seed, monte_carlo_estimate,
    monte_carlo_var, simulate_batch,
};
pub use parametric::{NormalFit, loss_quantile, parametric_estimate, parametric_var};
pub use portfolio::{PortfolioInputs, portfolio_estimate, portfolio_var};
pub use stress::{Scenario, StressInput, stress_test};
