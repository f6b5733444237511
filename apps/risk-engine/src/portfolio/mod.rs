//! Portfolio manager.
//!
//! Owns position state (quantities, cost basis, market values), applies
//! trades, and aggregates weights and exposures for the risk calculator.
//!
//! All mutation goes through [`PortfolioManager`]; callers that share a book
//! across threads serialize access behind a single lock.

mod manager;
mod position;
mod sample;
mod summary;
mod trade;

pub use manager::PortfolioManager;
pub use position::Position;
pub use sample::{SAMPLE_TRADES, sample_portfolio, sample_timestamp};
pub use summary::{ExposureConvention, PortfolioSummary, PositionSummary};
pub use trade::Trade;
