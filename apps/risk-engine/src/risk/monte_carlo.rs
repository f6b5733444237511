//! Seeded Monte Carlo VaR.
//!
//! Simulation is split into fixed-size batches. Batch `b` draws from its own
//! generator seeded by [`batch_seed`]`(seed, b)`, so batches are independent:
//! they run in parallel on rayon here, and [`simulate_batch`] lets a caller
//! farm them out elsewhere and concatenate the results in batch order. The
//! sample for a given `(seed, batch_size)` is bit-identical however the
//! batches are scheduled.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::historical::{expected_shortfall, historical_var};
use super::metric::{VarEstimate, validate_confidence};
use super::parametric::NormalFit;
use crate::error::{RiskError, RiskResult};

/// Fewest simulations accepted; below this noise dominates the percentile.
pub const MIN_SIMULATIONS: usize = 1_000;

/// Default draws per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Parameters of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Total number of draws.
    pub n_simulations: usize,
    /// Draws per independently seeded batch.
    pub batch_size: usize,
    /// Root seed.
    pub seed: u64,
}

impl SimulationRequest {
    /// Request with the default batch size.
    #[must_use]
    pub const fn new(n_simulations: usize, seed: u64) -> Self {
        Self {
            n_simulations,
            batch_size: DEFAULT_BATCH_SIZE,
            seed,
        }
    }

    /// Override the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Check the simulation count floor and batch size.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `n_simulations < MIN_SIMULATIONS` or the
    /// batch size is zero.
    pub fn validate(&self) -> RiskResult<()> {
        if self.n_simulations < MIN_SIMULATIONS {
            return Err(RiskError::configuration(format!(
                "n_simulations must be at least {MIN_SIMULATIONS}, got {}",
                self.n_simulations
            )));
        }
        if self.batch_size == 0 {
            return Err(RiskError::configuration("batch_size must be positive"));
        }
        Ok(())
    }

    /// Number of batches.
    #[must_use]
    pub const fn batch_count(&self) -> usize {
        self.n_simulations.div_ceil(self.batch_size)
    }

    /// Draws in batch `b` (the last batch may be short).
    #[must_use]
    pub fn batch_len(&self, batch: usize) -> usize {
        let start = batch * self.batch_size;
        self.batch_size.min(self.n_simulations.saturating_sub(start))
    }
}

/// Derive the generator seed of batch `batch` from the root seed.
#[must_use]
pub const fn batch_seed(seed: u64, batch: usize) -> u64 {
    // splitmix64 finalizer over the (seed, batch) pair
    let mut z = seed ^ (batch as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw one batch of normal returns.
///
/// Concatenating `simulate_batch` over `0..request.batch_count()` reproduces
/// the sample used by [`monte_carlo_estimate`].
#[must_use]
pub fn simulate_batch(mean: f64, std_dev: f64, request: &SimulationRequest, batch: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(batch_seed(request.seed, batch));
    draw_normals(&mut rng, mean, std_dev, request.batch_len(batch))
}

fn draw_normals(rng: &mut StdRng, mean: f64, std_dev: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|_| {
            let z: f64 = rng.sample(StandardNormal);
            mean + std_dev * z
        })
        .collect()
}

/// Run every batch of `request` through `draw` in parallel, in batch order.
///
/// The token is checked before each batch starts.
pub(crate) fn run_batches<F>(
    request: &SimulationRequest,
    cancel: Option<&CancellationToken>,
    draw: F,
) -> RiskResult<Vec<f64>>
where
    F: Fn(&mut StdRng, usize) -> Vec<f64> + Sync,
{
    request.validate()?;
    let batches: Vec<Vec<f64>> = (0..request.batch_count())
        .into_par_iter()
        .map(|batch| {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(RiskError::Cancelled("monte carlo simulation"));
            }
            let mut rng = StdRng::seed_from_u64(batch_seed(request.seed, batch));
            Ok(draw(&mut rng, request.batch_len(batch)))
        })
        .collect::<RiskResult<_>>()?;

    debug!(
        n_simulations = request.n_simulations,
        batches = batches.len(),
        seed = request.seed,
        "Monte Carlo batches complete"
    );
    Ok(batches.into_iter().flatten().collect())
}

/// Apply the historical percentile rule to a simulated sample.
pub(crate) fn sample_estimate(sample: &[f64], confidence: f64) -> RiskResult<VarEstimate> {
    let var = historical_var(sample, confidence)?;
    let expected_shortfall = expected_shortfall(sample, confidence, var)?;
    Ok(VarEstimate {
        var,
        expected_shortfall,
    })
}

/// Monte Carlo VaR and ES of a fitted normal.
///
/// A zero-variance series yields 0 without simulating.
///
/// # Errors
///
/// - `Configuration` for too few simulations or a zero batch size.
/// - `InsufficientData` for fewer than two returns.
/// - `InvalidInput` for non-finite returns or a confidence outside (0, 1).
/// - `Cancelled` if the token fires before all batches ran.
pub fn monte_carlo_estimate(
    returns: &[f64],
    confidence: f64,
    request: &SimulationRequest,
    cancel: Option<&CancellationToken>,
) -> RiskResult<VarEstimate> {
    request.validate()?;
    validate_confidence(confidence)?;
    let fit = NormalFit::from_returns("monte_carlo_var", returns)?;
    if fit.is_degenerate() {
        return Ok(VarEstimate::ZERO);
    }
    let sample = run_batches(request, cancel, |rng, len| {
        draw_normals(rng, fit.mean, fit.std_dev, len)
    })?;
    sample_estimate(&sample, confidence)
}

/// Monte Carlo VaR with the default batch size and no cancellation.
///
/// # Errors
///
/// Same as [`monte_carlo_estimate`].
pub fn monte_carlo_var(
    returns: &[f64],
    confidence: f64,
    n_simulations: usize,
    seed: u64,
) -> RiskResult<f64> {
    let request = SimulationRequest::new(n_simulations, seed);
    monte_carlo_estimate(returns, confidence, &request, None).map(|e| e.var)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn returns() -> Vec<f64> {
        (0..60).map(|i| 0.02 * ((f64::from(i) * 1.3).sin()) - 0.001).collect()
    }

    #[test]
    fn test_bit_identical_for_fixed_seed() {
        let a = monte_carlo_var(&returns(), 0.95, 5_000, 42).unwrap();
        let b = monte_carlo_var(&returns(), 0.95, 5_000, 42).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
        let c = monte_carlo_var(&returns(), 0.95, 5_000, 43).unwrap();
        assert_ne!(a.to_bits(), c.to_bits());
    }

    #[test]
    fn test_below_floor_is_configuration_error() {
        let err = monte_carlo_var(&returns(), 0.95, 999, 1).unwrap_err();
        assert!(matches!(err, RiskError::Configuration(_)));
    }

    #[test]
    fn test_zero_variance_is_zero() {
        let var = monte_carlo_var(&[0.02; 10], 0.99, 1_000, 7).unwrap();
        assert_eq!(var, 0.0);
    }

    #[test]
    fn test_externally_distributed_batches_match() {
        let request = SimulationRequest::new(2_500, 11).with_batch_size(1_000);
        assert_eq!(request.batch_count(), 3);
        assert_eq!(request.batch_len(2), 500);

        let fit = NormalFit::from_returns("test", &returns()).unwrap();
        // Simulate the batches out of order, then reassemble by index.
        let mut parts: Vec<(usize, Vec<f64>)> = [2, 0, 1]
            .into_iter()
            .map(|b| (b, simulate_batch(fit.mean, fit.std_dev, &request, b)))
            .collect();
        parts.sort_by_key(|(b, _)| *b);
        let external: Vec<f64> = parts.into_iter().flat_map(|(_, v)| v).collect();
        let internal = run_batches(&request, None, |rng, len| {
            draw_normals(rng, fit.mean, fit.std_dev, len)
        })
        .unwrap();
        assert_eq!(external.len(), 2_500);
        assert_eq!(external, internal);
    }

    #[test]
    fn test_close_to_parametric() {
        let r = returns();
        let mc = monte_carlo_var(&r, 0.95, 200_000, 3).unwrap();
        let p = super::super::parametric::parametric_var(&r, 0.95).unwrap();
        assert!((mc - p).abs() / p < 0.05);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let request = SimulationRequest::new(5_000, 1).with_batch_size(1_000);
        let err = monte_carlo_estimate(&returns(), 0.95, &request, Some(&token)).unwrap_err();
        assert!(matches!(err, RiskError::Cancelled(_)));
    }

    #[test]
    fn test_batch_seeds_differ() {
        assert_ne!(batch_seed(1, 0), batch_seed(1, 1));
        assert_ne!(batch_seed(1, 0), batch_seed(2, 0));
    }
}
