//! Aligned multi-commodity returns and their correlation structure.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ReturnKind, compute_returns};
use crate::error::{RiskError, RiskResult};
use crate::models::{CommodityId, PriceSeries};
use crate::stats;

/// Returns of several commodities on common dates.
///
/// Stored column-major: `columns[j][t]` is commodity `j`'s return on row `t`.
/// Every column has the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMatrix {
    commodities: Vec<CommodityId>,
    columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Build from explicit columns.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if column count differs from commodity count or
    ///   columns have unequal lengths.
    /// - `InvalidInput` for non-finite values or duplicate commodities.
    pub fn new(commodities: Vec<CommodityId>, columns: Vec<Vec<f64>>) -> RiskResult<Self> {
        if columns.len() != commodities.len() {
            return Err(RiskError::dimension(
                "return matrix columns",
                commodities.len(),
                columns.len(),
            ));
        }
        let unique: BTreeSet<&CommodityId> = commodities.iter().collect();
        if unique.len() != commodities.len() {
            return Err(RiskError::invalid_input(
                "return_matrix",
                "duplicate commodity column",
            ));
        }
        if let Some(first) = columns.first() {
            for column in &columns {
                if column.len() != first.len() {
                    return Err(RiskError::dimension(
                        "return matrix rows",
                        first.len(),
                        column.len(),
                    ));
                }
                stats::ensure_finite("return_matrix", column)?;
            }
        }
        Ok(Self {
            commodities,
            columns,
        })
    }

    /// Align price histories on their common timestamps and derive returns.
    ///
    /// Only timestamps present in every series are kept, so each row is a
    /// genuine joint observation.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` if no series is supplied or fewer than two common
    ///   timestamps remain.
    /// - `InvalidPrice` from the returns engine.
    pub fn from_price_series(series: &[PriceSeries], kind: ReturnKind) -> RiskResult<Self> {
        if series.is_empty() {
            return Err(RiskError::insufficient("return matrix commodities", 1, 0));
        }

        let mut common: BTreeSet<DateTime<Utc>> =
            series[0].points().iter().map(|p| p.timestamp).collect();
        for s in &series[1..] {
            let stamps: BTreeSet<DateTime<Utc>> = s.points().iter().map(|p| p.timestamp).collect();
            common = common.intersection(&stamps).copied().collect();
        }

        let mut commodities = Vec::with_capacity(series.len());
        let mut columns = Vec::with_capacity(series.len());
        for s in series {
            let aligned: Vec<f64> = s
                .points()
                .iter()
                .filter(|p| common.contains(&p.timestamp))
                .map(|p| p.price)
                .collect();
            let returns = compute_returns(&aligned, kind)?;
            commodities.push(s.commodity().clone());
            columns.push(returns.into_values());
        }

        Self::new(commodities, columns)
    }

    /// Commodities in column order.
    #[must_use]
    pub fn commodities(&self) -> &[CommodityId] {
        &self.commodities
    }

    /// Number of commodities (columns).
    #[must_use]
    pub fn n_assets(&self) -> usize {
        self.columns.len()
    }

    /// Number of joint observations (rows).
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Column for the asset at `index`.
    #[must_use]
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// All columns.
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Column index of a commodity.
    #[must_use]
    pub fn index_of(&self, commodity: &CommodityId) -> Option<usize> {
        self.commodities.iter().position(|c| c == commodity)
    }

    /// Per-asset sample means.
    #[must_use]
    pub fn means(&self) -> Vec<f64> {
        self.columns.iter().map(|c| stats::mean(c)).collect()
    }

    /// Per-asset sample standard deviations.
    #[must_use]
    pub fn std_devs(&self) -> Vec<f64> {
        self.columns.iter().map(|c| stats::sample_std(c)).collect()
    }

    /// Same shape, columns replaced.
    pub(crate) fn with_columns(&self, columns: Vec<Vec<f64>>) -> RiskResult<Self> {
        Self::new(self.commodities.clone(), columns)
    }
}

/// Symmetric correlation matrix with unit diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    n: usize,
    /// Row-major values.
    values: Vec<f64>,
}

const SYMMETRY_TOLERANCE: f64 = 1e-9;

impl CorrelationMatrix {
    /// Build from row-major rows.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if not square.
    /// - `InvalidInput` if not symmetric, the diagonal is not 1, or an entry
    ///   is outside [-1, 1] or non-finite.
    pub fn from_rows(rows: &[Vec<f64>]) -> RiskResult<Self> {
        let n = rows.len();
        let mut values = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(RiskError::dimension("correlation matrix row", n, row.len()));
            }
            stats::ensure_finite("correlation_matrix", row)?;
            values.extend_from_slice(row);
        }
        let matrix = Self { n, values };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Identity matrix (uncorrelated assets).
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        Self { n, values }
    }

    /// Estimate Pearson correlations from aligned returns.
    #[must_use]
    pub fn estimate(returns: &ReturnMatrix) -> Self {
        let n = returns.n_assets();
        let mut matrix = Self::identity(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let rho = stats::pearson(returns.column(i), returns.column(j));
                matrix.values[i * n + j] = rho;
                matrix.values[j * n + i] = rho;
            }
        }
        matrix
    }

    fn validate(&self) -> RiskResult<()> {
        let n = self.n;
        for i in 0..n {
            if (self.get(i, i) - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(RiskError::invalid_input(
                    "correlation_matrix",
                    format!("diagonal entry ({i},{i}) must be 1, got {}", self.get(i, i)),
                ));
            }
            for j in 0..n {
                let v = self.get(i, j);
                if !(-1.0 - SYMMETRY_TOLERANCE..=1.0 + SYMMETRY_TOLERANCE).contains(&v) {
                    return Err(RiskError::invalid_input(
                        "correlation_matrix",
                        format!("entry ({i},{j}) = {v} outside [-1, 1]"),
                    ));
                }
                if (v - self.get(j, i)).abs() > SYMMETRY_TOLERANCE {
                    return Err(RiskError::invalid_input(
                        "correlation_matrix",
                        format!("matrix is not symmetric at ({i},{j})"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Dimension.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.n
    }

    /// Whether the matrix is 0×0.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Entry at (i, j).
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
