// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Risk Engine - Rust Core Library
//!
//! Value-at-Risk, Expected Shortfall, stress testing and limit monitoring
//! for agricultural commodity books.
//!
//! # Architecture
//!
//! ```text
//! market data ──► returns ──► risk calculator ──► monitor ──► report
//!                                  ▲
//! trades ──► portfolio manager ────┘ (exposures)
//! ```
//!
//! - **returns**: simple/log returns, aligned return matrices, correlation
//! - **risk**: historical, parametric and Monte Carlo VaR/ES, portfolio
//!   aggregation, stress scenarios
//! - **portfolio**: positions, cost basis, realized/unrealized P&L, weights
//! - **monitor**: per-limit breach state machine with audit trail
//! - **engine**: one monitoring pass over a book and a market-data port
//!
//! Calculations are pure functions over immutable snapshots; the only
//! mutable state is the position book and the alert table, each behind a
//! single lock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod portfolio;
pub mod report;
pub mod returns;
pub mod risk;
pub mod stats;

pub use config::{Config, ConfigError, load_config, load_config_from_string};
pub use engine::RiskEngine;
pub use error::{ErrorCode, RiskError, RiskResult};
pub use market_data::{InMemoryMarketData, MarketDataPort, SyntheticMarketData};
pub use models::{CommodityId, PricePoint, PriceSeries};
pub use monitor::{AlertState, AuditEvent, LimitId, RiskLimits, RiskMonitor};
pub use portfolio::{PortfolioManager, PortfolioSummary, Position, Trade};
pub use report::RiskReport;
pub use returns::{CorrelationMatrix, ReturnKind, ReturnMatrix, ReturnSeries, compute_returns};
pub use risk::{RiskCalculator, RiskMetric, Scenario, VarMethod};
