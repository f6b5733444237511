//! Portfolio aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::CommodityId;

/// How long and short market values combine into exposure.
///
/// The same convention drives the summary's total value and weights and the
/// exposure vector handed to the risk calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExposureConvention {
    /// Absolute market value: shorts add to exposure.
    #[default]
    Gross,
    /// Signed market value: shorts offset longs.
    Net,
}

/// One position line in a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    /// Commodity.
    pub commodity: CommodityId,
    /// Signed quantity.
    pub quantity: Decimal,
    /// Average entry price; `None` when flat.
    pub avg_entry_price: Option<Decimal>,
    /// Signed market value.
    pub market_value: Decimal,
    /// Exposure under the active convention.
    pub exposure: Decimal,
    /// Exposure / total value (0 when total is 0).
    pub weight: f64,
    /// Realized P&L.
    pub realized_pnl: Decimal,
    /// Unrealized P&L against the last mark.
    pub unrealized_pnl: Decimal,
    /// Market value is from a failed refresh.
    pub stale: bool,
}

/// Point-in-time view of the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Sum of position exposures plus cash.
    pub total_value: Decimal,
    /// Cash balance.
    pub cash: Decimal,
    /// Cash / total value.
    pub cash_weight: f64,
    /// Per-commodity weights.
    pub weights: BTreeMap<CommodityId, f64>,
    /// Position lines in commodity order.
    pub positions: Vec<PositionSummary>,
    /// Positions with non-zero quantity.
    pub open_positions: usize,
    /// Commodities whose market value is stale.
    pub stale: Vec<CommodityId>,
    /// Convention the figures were computed under.
    pub convention: ExposureConvention,
    /// When the summary was taken.
    pub as_of: DateTime<Utc>,
}

impl PortfolioSummary {
    /// Position line for a commodity.
    #[must_use]
    pub fn position(&self, commodity: &CommodityId) -> Option<&PositionSummary> {
        self.positions.iter().find(|p| &p.commodity == commodity)
    }

    /// Exposure to a commodity as `f64`, 0 without a position.
    #[must_use]
    pub fn exposure_of(&self, commodity: &CommodityId) -> f64 {
        self.position(commodity)
            .and_then(|p| p.exposure.to_f64())
            .unwrap_or(0.0)
    }

    /// Whether any market value is stale.
    #[must_use]
    pub fn has_stale(&self) -> bool {
        !self.stale.is_empty()
    }
}

/// `part / total` as `f64`, 0 when total is 0.
pub(crate) fn weight(part: Decimal, total: Decimal) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (part / total).to_f64().unwrap_or(0.0)
}
