//! Core value types shared by the returns engine, calculator, portfolio and
//! monitor.

mod commodity;
mod price;

pub use commodity::CommodityId;
pub use price::{PricePoint, PriceSeries};
