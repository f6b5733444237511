//! Immutable trade records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RiskError, RiskResult};
use crate::models::CommodityId;

/// An executed trade. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    id: Uuid,
    commodity: CommodityId,
    timestamp: DateTime<Utc>,
    quantity: Decimal,
    price: Decimal,
}

impl Trade {
    /// Create a trade.
    ///
    /// `quantity` is the signed delta (positive buys, negative sells); zero is
    /// accepted and recorded without economic effect.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrice` for a non-positive execution price and
    /// `InvalidInput` for an empty commodity.
    pub fn new(
        commodity: impl Into<CommodityId>,
        quantity: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> RiskResult<Self> {
        let commodity = commodity.into();
        if commodity.is_empty() {
            return Err(RiskError::invalid_input("commodity", "must not be empty"));
        }
        if price <= Decimal::ZERO {
            return Err(RiskError::InvalidPrice {
                index: 0,
                price: price.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            commodity,
            timestamp,
            quantity,
            price,
        })
    }

    /// Replace the generated identifier, for replayed or fixture trades.
    #[must_use]
    pub const fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Trade identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Traded commodity.
    #[must_use]
    pub const fn commodity(&self) -> &CommodityId {
        &self.commodity
    }

    /// Execution time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Signed quantity delta.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Execution price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Signed traded value.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}
