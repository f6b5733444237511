//! Position book and trade history.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use super::position::Position;
use super::summary::{ExposureConvention, PortfolioSummary, PositionSummary, weight};
use super::trade::Trade;
use crate::error::{RiskError, RiskResult};
use crate::models::CommodityId;

/// Owns positions, cash and the append-only trade history.
#[derive(Debug, Clone, Default)]
pub struct PortfolioManager {
    positions: BTreeMap<CommodityId, Position>,
    trades: Vec<Trade>,
    cash: Decimal,
    convention: ExposureConvention,
}

impl PortfolioManager {
    /// Empty book under `convention`.
    #[must_use]
    pub fn new(convention: ExposureConvention) -> Self {
        Self {
            convention,
            ..Self::default()
        }
    }

    /// Set the starting cash balance.
    #[must_use]
    pub const fn with_cash(mut self, cash: Decimal) -> Self {
        self.cash = cash;
        self
    }

    /// Replace the cash balance. Trades do not move cash.
    pub fn set_cash(&mut self, cash: Decimal) {
        self.cash = cash;
    }

    /// Cash balance.
    #[must_use]
    pub const fn cash(&self) -> Decimal {
        self.cash
    }

    /// Active exposure convention.
    #[must_use]
    pub const fn convention(&self) -> ExposureConvention {
        self.convention
    }

    /// Apply a trade and return the updated position.
    ///
    /// The trade is appended to history even when its quantity is zero.
    pub fn apply_trade(&mut self, trade: Trade) -> Position {
        let position = self
            .positions
            .entry(trade.commodity().clone())
            .or_insert_with(|| Position::new(trade.commodity().clone(), trade.timestamp()));
        let realized = position.apply_fill(trade.quantity(), trade.price(), trade.timestamp());
        let updated = position.clone();

        debug!(
            trade_id = %trade.id(),
            commodity = %trade.commodity(),
            quantity = %trade.quantity(),
            price = %trade.price(),
            position = %updated.quantity,
            realized = %realized,
            "Trade applied"
        );
        self.trades.push(trade);
        updated
    }

    /// Revalue a position at `price`.
    ///
    /// A missing price keeps the last market value and flags the position
    /// stale.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a commodity with no position.
    /// - `InvalidPrice` for a non-positive price.
    pub fn update_market_value(
        &mut self,
        commodity: &CommodityId,
        price: Option<Decimal>,
    ) -> RiskResult<Position> {
        let position = self.positions.get_mut(commodity).ok_or_else(|| {
            RiskError::invalid_input("commodity", format!("no position in {commodity}"))
        })?;

        match price {
            Some(price) if price <= Decimal::ZERO => {
                return Err(RiskError::InvalidPrice {
                    index: 0,
                    price: price.to_f64().unwrap_or(f64::NAN),
                });
            }
            Some(price) => position.mark(price, Utc::now()),
            None => {
                warn!(commodity = %commodity, "Price unavailable, keeping last market value");
                position.stale = true;
            }
        }
        Ok(position.clone())
    }

    /// Totals, weights and position lines under the active convention.
    #[must_use]
    pub fn portfolio_summary(&self) -> PortfolioSummary {
        let exposures: Decimal = self
            .positions
            .values()
            .map(|p| p.exposure(self.convention))
            .sum();
        let total_value = exposures + self.cash;

        let positions: Vec<PositionSummary> = self
            .positions
            .values()
            .map(|p| {
                let exposure = p.exposure(self.convention);
                PositionSummary {
                    commodity: p.commodity.clone(),
                    quantity: p.quantity,
                    avg_entry_price: p.avg_entry_price,
                    market_value: p.market_value,
                    exposure,
                    weight: weight(exposure, total_value),
                    realized_pnl: p.realized_pnl,
                    unrealized_pnl: p.unrealized_pnl(),
                    stale: p.stale,
                }
            })
            .collect();

        PortfolioSummary {
            total_value,
            cash: self.cash,
            cash_weight: weight(self.cash, total_value),
            weights: positions
                .iter()
                .map(|p| (p.commodity.clone(), p.weight))
                .collect(),
            open_positions: self.positions.values().filter(|p| !p.is_flat()).count(),
            stale: self
                .positions
                .values()
                .filter(|p| p.stale)
                .map(|p| p.commodity.clone())
                .collect(),
            positions,
            convention: self.convention,
            as_of: Utc::now(),
        }
    }

    /// Dollar exposures aligned to `commodities`, 0 where there is no position.
    #[must_use]
    pub fn exposure_vector(&self, commodities: &[CommodityId]) -> Vec<f64> {
        commodities
            .iter()
            .map(|c| {
                self.positions
                    .get(c)
                    .and_then(|p| p.exposure(self.convention).to_f64())
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Position in a commodity.
    #[must_use]
    pub fn position(&self, commodity: &CommodityId) -> Option<&Position> {
        self.positions.get(commodity)
    }

    /// All positions, including flat ones, in commodity order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Commodities with a non-zero quantity.
    #[must_use]
    pub fn open_commodities(&self) -> Vec<CommodityId> {
        self.positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| p.commodity.clone())
            .collect()
    }

    /// Trade history in application order.
    #[must_use]
    pub fn trade_history(&self) -> &[Trade] {
        &self.trades
    }

    /// Realized P&L across all positions.
    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Unrealized P&L of one position.
    #[must_use]
    pub fn unrealized_pnl(&self, commodity: &CommodityId) -> Option<Decimal> {
        self.positions.get(commodity).map(Position::unrealized_pnl)
    }
}
