//! Market data port.
//!
//! The engine pulls fully resolved price histories and latest prices through
//! [`MarketDataPort`]. Providers own fetching, caching and gap handling; the
//! engine only sees the result and a staleness flag.

mod memory;
mod synthetic;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskResult;
use crate::models::{CommodityId, PriceSeries};

pub use memory::InMemoryMarketData;
pub use synthetic::{SyntheticMarketData, SyntheticSettings};

/// Price history of one commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// Observations, oldest first.
    pub series: PriceSeries,
    /// The provider could not refresh the history.
    pub stale: bool,
}

/// Latest price of one commodity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Commodity.
    pub commodity: CommodityId,
    /// Price.
    pub price: Decimal,
    /// Observation time.
    pub timestamp: DateTime<Utc>,
    /// The quote is older than the provider's freshness window.
    pub stale: bool,
}

/// Source of prices for the risk engine.
pub trait MarketDataPort: Send + Sync {
    /// Most recent `days` observations for a commodity.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` if the provider has no history for the
    /// commodity.
    fn history(&self, commodity: &CommodityId, days: usize) -> RiskResult<PriceHistory>;

    /// Latest price, or `None` if the provider has none.
    fn latest(&self, commodity: &CommodityId) -> Option<PriceQuote>;
}

/// Trailing window of at most `days` observations.
pub(crate) fn trailing(series: &PriceSeries, days: usize) -> RiskResult<PriceSeries> {
    let points = series.points();
    let start = points.len().saturating_sub(days);
    PriceSeries::new(series.commodity().clone(), points[start..].to_vec())
}
