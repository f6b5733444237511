//! Returns engine.
//!
//! Derives return series from price histories. This is the foundation for
//! all risk math: every calculator operation consumes its output.
//!
//! - [`compute_returns`]: simple or log returns of a single price sequence
//! - [`ReturnMatrix`]: several commodities aligned on common dates
//! - [`CorrelationMatrix`]: estimated or supplied correlation structure

mod matrix;
mod series;

pub use matrix::{CorrelationMatrix, ReturnMatrix};
pub use series::{ReturnKind, ReturnSeries, compute_returns, returns_for};
