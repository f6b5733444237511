//! Portfolio-level VaR over a dollar-exposure vector.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::StandardNormal;
use tokio_util::sync::CancellationToken;

use super::historical::historical_estimate;
use super::metric::{VarEstimate, VarMethod, validate_confidence};
use super::monte_carlo::{SimulationRequest, run_batches, sample_estimate};
use super::parametric::normal_estimate;
use crate::error::{RiskError, RiskResult};
use crate::returns::{CorrelationMatrix, ReturnMatrix};
use crate::stats;

/// Exposures, aligned returns and correlation for one portfolio evaluation.
///
/// `exposures[j]` is the dollar exposure to `returns.commodities()[j]`.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioInputs<'a> {
    /// Dollar exposure per commodity.
    pub exposures: &'a [f64],
    /// Aligned return columns.
    pub returns: &'a ReturnMatrix,
    /// Correlation between the columns.
    pub correlation: &'a CorrelationMatrix,
}

impl<'a> PortfolioInputs<'a> {
    /// Bundle inputs.
    #[must_use]
    pub const fn new(
        exposures: &'a [f64],
        returns: &'a ReturnMatrix,
        correlation: &'a CorrelationMatrix,
    ) -> Self {
        Self {
            exposures,
            returns,
            correlation,
        }
    }

    /// Check shapes and values agree.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if exposure, return or correlation sizes differ.
    /// - `InsufficientData` for an empty portfolio.
    /// - `InvalidInput` for non-finite exposures.
    pub fn validate(&self) -> RiskResult<()> {
        let n = self.returns.n_assets();
        if self.exposures.len() != n {
            return Err(RiskError::dimension("exposure vector", n, self.exposures.len()));
        }
        if self.correlation.len() != n {
            return Err(RiskError::dimension("correlation matrix", n, self.correlation.len()));
        }
        if n == 0 {
            return Err(RiskError::insufficient("portfolio_var assets", 1, 0));
        }
        stats::ensure_finite("exposures", self.exposures)
    }

    /// Portfolio P&L on each observed joint return row.
    #[must_use]
    pub fn pnl_series(&self) -> Vec<f64> {
        (0..self.returns.n_observations())
            .map(|t| {
                self.exposures
                    .iter()
                    .zip(self.returns.columns())
                    .map(|(w, column)| w * column[t])
                    .sum::<f64>()
            })
            .collect()
    }

    /// Covariance matrix `sigma_i * sigma_j * rho_ij`.
    #[must_use]
    pub fn covariance(&self) -> DMatrix<f64> {
        let sigma = self.returns.std_devs();
        let n = sigma.len();
        DMatrix::from_fn(n, n, |i, j| sigma[i] * sigma[j] * self.correlation.get(i, j))
    }

    /// Portfolio standard deviation `sqrt(w' Σ w)`.
    #[must_use]
    pub fn portfolio_std(&self) -> f64 {
        let w = DVector::from_column_slice(self.exposures);
        let variance = (w.transpose() * self.covariance() * &w)[(0, 0)];
        variance.max(0.0).sqrt()
    }
}

/// Portfolio VaR in currency units.
///
/// `simulation` is used only by [`VarMethod::MonteCarlo`].
///
/// # Errors
///
/// Same as [`portfolio_estimate`].
pub fn portfolio_var(
    inputs: &PortfolioInputs<'_>,
    confidence: f64,
    method: VarMethod,
    simulation: &SimulationRequest,
) -> RiskResult<f64> {
    portfolio_estimate(inputs, confidence, method, simulation, None).map(|e| e.var)
}

/// Portfolio VaR and ES in currency units.
///
/// - Parametric: `z * sqrt(w' Σ w)` with the normal closed-form ES.
/// - Historical: percentile of the exposure vector revalued on every observed
///   joint return row.
/// - Monte Carlo: correlated normals through a factor of the correlation
///   matrix (Cholesky, or clipped eigendecomposition when only
///   semidefinite), scaled by each column's mean and volatility.
///
/// # Errors
///
/// - `DimensionMismatch` if exposure, return or correlation shapes disagree.
/// - `InsufficientData` for no assets, or too few joint observations.
/// - `InvalidInput` for non-finite exposures, a confidence outside (0, 1) or
///   a correlation matrix with a negative eigenvalue (Monte Carlo).
/// - `Configuration` / `Cancelled` from the simulation.
pub fn portfolio_estimate(
    inputs: &PortfolioInputs<'_>,
    confidence: f64,
    method: VarMethod,
    simulation: &SimulationRequest,
    cancel: Option<&CancellationToken>,
) -> RiskResult<VarEstimate> {
    validate_confidence(confidence)?;
    inputs.validate()?;
    let observations = inputs.returns.n_observations();

    match method {
        VarMethod::Historical => {
            if observations == 0 {
                return Err(RiskError::insufficient("portfolio historical var", 1, 0));
            }
            historical_estimate(&inputs.pnl_series(), confidence)
        }
        VarMethod::Parametric => {
            if observations < 2 {
                return Err(RiskError::insufficient("portfolio parametric var", 2, observations));
            }
            normal_estimate(0.0, inputs.portfolio_std(), confidence)
        }
        VarMethod::MonteCarlo => {
            simulation.validate()?;
            if observations < 2 {
                return Err(RiskError::insufficient("portfolio monte carlo var", 2, observations));
            }
            simulate_portfolio(inputs, confidence, simulation, cancel)
        }
    }
}

fn simulate_portfolio(
    inputs: &PortfolioInputs<'_>,
    confidence: f64,
    simulation: &SimulationRequest,
    cancel: Option<&CancellationToken>,
) -> RiskResult<VarEstimate> {
    let means = inputs.returns.means();
    let sigma = inputs.returns.std_devs();
    if sigma.iter().all(|s| *s == 0.0) {
        return Ok(VarEstimate::ZERO);
    }

    let n = means.len();
    let factor = correlation_factor(DMatrix::from_row_slice(n, n, inputs.correlation.values()))?;

    let sample = run_batches(simulation, cancel, |rng, len| {
        let mut z = DVector::<f64>::zeros(n);
        (0..len)
            .map(|_| {
                for value in z.iter_mut() {
                    *value = rng.sample(StandardNormal);
                }
                let correlated = &factor * &z;
                (0..n)
                    .map(|i| inputs.exposures[i] * (means[i] + sigma[i] * correlated[i]))
                    .sum::<f64>()
            })
            .collect()
    })?;
    sample_estimate(&sample, confidence)
}

/// Eigenvalues above `-EIGEN_TOLERANCE * n` count as round-off zeros.
const EIGEN_TOLERANCE: f64 = 1e-10;

/// A matrix `F` with `F Fᵀ = rho`.
///
/// The Cholesky factor when `rho` is positive definite. Otherwise the
/// symmetric eigendecomposition `V sqrt(Λ)` with round-off eigenvalues
/// clipped to zero, which covers perfectly correlated columns and more
/// assets than joint observations.
fn correlation_factor(rho: DMatrix<f64>) -> RiskResult<DMatrix<f64>> {
    if let Some(cholesky) = rho.clone().cholesky() {
        return Ok(cholesky.l());
    }
    let n = rho.nrows();
    let eigen = SymmetricEigen::new(rho);
    if let Some(negative) = eigen
        .eigenvalues
        .iter()
        .copied()
        .find(|v| *v < -EIGEN_TOLERANCE * n as f64)
    {
        return Err(RiskError::invalid_input(
            "correlation_matrix",
            format!("matrix is not positive semidefinite (eigenvalue {negative:.3e})"),
        ));
    }
    let roots = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    Ok(eigen.eigenvectors * DMatrix::from_diagonal(&roots))
}
