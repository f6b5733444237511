//! Deterministic demo book.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::manager::PortfolioManager;
use super::summary::ExposureConvention;
use super::trade::Trade;

/// Fixed demo trades: (commodity, quantity, price).
pub const SAMPLE_TRADES: [(&str, i64, i64); 7] = [
    ("Corn", 70_000, 350),
    ("Wheat", 58_000, 550),
    ("Soybeans", 59_500, 900),
    ("Sugar", 72_000, 18),
    ("Coffee", 64_000, 270),
    ("Cotton", 77_000, 65),
    ("Cocoa", 2_000, 8_000),
];

/// Timestamp of every sample trade: 2024-01-02T00:00:00Z.
#[must_use]
pub fn sample_timestamp() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::days(19_724)
}

/// Build the demo book from [`SAMPLE_TRADES`].
///
/// Identical on every call, trade ids included: the n-th trade has id `n`.
#[must_use]
pub fn sample_portfolio(convention: ExposureConvention) -> PortfolioManager {
    let mut manager = PortfolioManager::new(convention);
    for (n, (commodity, quantity, price)) in (1u128..).zip(SAMPLE_TRADES) {
        if let Ok(trade) = Trade::new(
            commodity,
            Decimal::from(quantity),
            Decimal::from(price),
            sample_timestamp(),
        ) {
            manager.apply_trade(trade.with_id(Uuid::from_u128(n)));
        }
    }
    manager
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommodityId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sample_portfolio_is_deterministic() {
        let a = sample_portfolio(ExposureConvention::Gross);
        let b = sample_portfolio(ExposureConvention::Gross);
        assert_eq!(a.trade_history().len(), 7);
        let sa = a.portfolio_summary();
        let sb = b.portfolio_summary();
        assert_eq!(sa.total_value, sb.total_value);
        assert_eq!(sa.weights, sb.weights);
        assert_eq!(sa.open_positions, 7);

        let ids = |pm: &PortfolioManager| pm.trade_history().iter().map(Trade::id).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(ids(&a)[0], Uuid::from_u128(1));
    }

    #[test]
    fn test_sample_values() {
        let pm = sample_portfolio(ExposureConvention::Gross);
        let corn = pm.position(&CommodityId::new("corn")).unwrap();
        assert_eq!(corn.market_value, dec!(24_500_000));
        assert_eq!(corn.avg_entry_price, Some(dec!(350)));
        assert_eq!(pm.portfolio_summary().total_value, dec!(149_531_000));
        assert_eq!(sample_timestamp().to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }
}
