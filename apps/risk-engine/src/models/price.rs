//! Price history supplied by the market-data collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CommodityId;
use crate::error::{RiskError, RiskResult};

/// One price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Observation time.
    pub timestamp: DateTime<Utc>,
    /// Observed price. A missing observation is carried as NaN and rejected
    /// by the returns engine.
    pub price: f64,
}

impl PricePoint {
    /// Create a new observation.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Time-ascending price history of one commodity.
///
/// Construction guarantees strictly increasing timestamps. Price values are
/// validated when returns are derived, not here, so a series with a bad
/// print can still be inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceSeries", into = "RawPriceSeries")]
pub struct PriceSeries {
    commodity: CommodityId,
    points: Vec<PricePoint>,
}

#[derive(Serialize, Deserialize)]
struct RawPriceSeries {
    commodity: CommodityId,
    points: Vec<PricePoint>,
}

impl TryFrom<RawPriceSeries> for PriceSeries {
    type Error = RiskError;

    fn try_from(raw: RawPriceSeries) -> Result<Self, Self::Error> {
        Self::new(raw.commodity, raw.points)
    }
}

impl From<PriceSeries> for RawPriceSeries {
    fn from(series: PriceSeries) -> Self {
        Self {
            commodity: series.commodity,
            points: series.points,
        }
    }
}

impl PriceSeries {
    /// Create a price series.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if timestamps are not strictly ascending
    /// (which also rules out duplicates).
    pub fn new(commodity: CommodityId, points: Vec<PricePoint>) -> RiskResult<Self> {
        if let Some(i) = points
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(RiskError::invalid_input(
                "price_series",
                format!(
                    "{commodity}: timestamps must be strictly ascending (index {} at {})",
                    i + 1,
                    points[i + 1].timestamp
                ),
            ));
        }
        Ok(Self { commodity, points })
    }

    /// Build a series from daily closes starting at `start`, one day apart.
    ///
    /// # Errors
    ///
    /// Never fails in practice; kept fallible to share validation with [`Self::new`].
    pub fn daily(commodity: CommodityId, start: DateTime<Utc>, closes: &[f64]) -> RiskResult<Self> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint::new(start + chrono::Duration::days(i as i64), price))
            .collect();
        Self::new(commodity, points)
    }

    /// Commodity this series belongs to.
    #[must_use]
    pub const fn commodity(&self) -> &CommodityId {
        &self.commodity
    }

    /// All observations.
    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Prices only, in time order.
    #[must_use]
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent observation.
    #[must_use]
    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}
