//! Per-commodity position state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use serde::{Deserialize, Serialize};

use super::summary::ExposureConvention;
use crate::models::CommodityId;

/// Position in one commodity.
///
/// Created on the first trade and never removed; a closed position stays in
/// the book with quantity zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Commodity.
    pub commodity: CommodityId,
    /// Signed quantity (positive = long, negative = short).
    pub quantity: Decimal,
    /// Volume-weighted entry price; `None` when flat.
    pub avg_entry_price: Option<Decimal>,
    /// Accumulated realized P&L.
    pub realized_pnl: Decimal,
    /// Last computed market value (quantity × mark).
    pub market_value: Decimal,
    /// Last mark price.
    pub last_price: Option<Decimal>,
    /// Last trade or price update.
    pub updated_at: DateTime<Utc>,
    /// The latest price refresh failed; market value is the last known one.
    pub stale: bool,
}

impl Position {
    /// Flat position.
    #[must_use]
    pub fn new(commodity: CommodityId, at: DateTime<Utc>) -> Self {
        Self {
            commodity,
            quantity: Decimal::ZERO,
            avg_entry_price: None,
            realized_pnl: Decimal::ZERO,
            market_value: Decimal::ZERO,
            last_price: None,
            updated_at: at,
            stale: false,
        }
    }

    /// Check if position is flat.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Apply a fill and return the P&L it realized.
    ///
    /// Adding to the position (or opening it) blends the average price by
    /// quantity. Reducing realizes P&L on the closed quantity and keeps the
    /// basis; closing exactly clears it; flipping sides resets it to `price`.
    pub(crate) fn apply_fill(&mut self, delta: Decimal, price: Decimal, at: DateTime<Utc>) -> Decimal {
        if delta.is_zero() {
            return Decimal::ZERO;
        }

        let old = self.quantity;
        let new = old + delta;
        let mut realized = Decimal::ZERO;

        if old.is_zero() || old.is_sign_positive() == delta.is_sign_positive() {
            let basis = self.avg_entry_price.unwrap_or(price);
            self.avg_entry_price = Some((old.abs() * basis + delta.abs() * price) / new.abs());
        } else {
            let closed = delta.abs().min(old.abs());
            let basis = self.avg_entry_price.unwrap_or(price);
            realized = (price - basis) * closed * old.signum();

            if new.is_zero() {
                self.avg_entry_price = None;
            } else if new.is_sign_positive() != old.is_sign_positive() {
                self.avg_entry_price = Some(price);
            }
        }

        self.quantity = new;
        self.realized_pnl += realized;
        self.mark(price, at);
        realized
    }

    /// Revalue at `price`.
    pub(crate) fn mark(&mut self, price: Decimal, at: DateTime<Utc>) {
        self.last_price = Some(price);
        self.market_value = self.quantity * price;
        self.updated_at = at;
        self.stale = false;
    }

    /// Unrealized P&L against the last mark.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        match (self.avg_entry_price, self.last_price) {
            (Some(basis), Some(mark)) => (mark - basis) * self.quantity,
            _ => Decimal::ZERO,
        }
    }

    /// Exposure under a convention.
    #[must_use]
    pub fn exposure(&self, convention: ExposureConvention) -> Decimal {
        match convention {
            ExposureConvention::Gross => self.market_value.abs(),
            ExposureConvention::Net => self.market_value,
        }
    }
}
