//! Error taxonomy for the risk engine.
//!
//! Every failure of a calculation, portfolio or monitoring operation is a
//! local, recoverable condition: the caller decides whether to retry with
//! corrected input, skip the metric, or surface it.
//!
//! | Code | Usage |
//! |------|-------|
//! | `INSUFFICIENT_DATA` | Too few observations for the requested statistic |
//! | `INVALID_INPUT` | NaN, non-finite or otherwise forbidden values |
//! | `INVALID_PRICE` | Price that cannot be used (non-positive, NaN) |
//! | `DIMENSION_MISMATCH` | Exposure / return / correlation shapes disagree |
//! | `CONFIGURATION` | Simulation count below floor, unknown confidence, scenario or limit |
//! | `CANCELLED` | Caller cancelled a long-running simulation |
//!
//! Stale market data is never an error; it is a flag on the computed values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the engine.
pub type RiskResult<T> = Result<T, RiskError>;

/// Stable error codes for the engine's failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Too few observations.
    InsufficientData,
    /// Invalid numeric or structural input.
    InvalidInput,
    /// Invalid price observation.
    InvalidPrice,
    /// Shapes of vectors/matrices disagree.
    DimensionMismatch,
    /// Configuration problem or unknown configured entity.
    Configuration,
    /// Operation cancelled by the caller.
    Cancelled,
}

impl ErrorCode {
    /// Get the reason string for this code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidPrice => "INVALID_PRICE",
            Self::DimensionMismatch => "DIMENSION_MISMATCH",
            Self::Configuration => "CONFIGURATION",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Errors raised by the returns engine, risk calculator, portfolio manager
/// and risk monitor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// Too few observations for the requested statistic.
    #[error("insufficient data for {statistic}: need at least {required}, got {actual}")]
    InsufficientData {
        /// Statistic being computed.
        statistic: &'static str,
        /// Minimum observations required.
        required: usize,
        /// Observations supplied.
        actual: usize,
    },

    /// Null/NaN or otherwise forbidden input value.
    #[error("invalid input [{field}]: {message}")]
    InvalidInput {
        /// Offending field or argument.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Price observation that cannot be used.
    #[error("invalid price at index {index}: {price}")]
    InvalidPrice {
        /// Position of the price in its series (0 for single prices).
        index: usize,
        /// The offending price.
        price: f64,
    },

    /// Exposure, return and correlation dimensions disagree.
    #[error("dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which shapes were compared.
        context: &'static str,
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Configuration problem (simulation floor, unknown confidence/scenario/limit).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A long-running computation was cancelled by the caller.
    #[error("{0} cancelled")]
    Cancelled(&'static str),
}

impl RiskError {
    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InsufficientData { .. } => ErrorCode::InsufficientData,
            Self::InvalidInput { .. } => ErrorCode::InvalidInput,
            Self::InvalidPrice { .. } => ErrorCode::InvalidPrice,
            Self::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::Cancelled(_) => ErrorCode::Cancelled,
        }
    }

    /// Invalid input for a named field.
    #[must_use]
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Insufficient observations for a statistic.
    #[must_use]
    pub const fn insufficient(statistic: &'static str, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            statistic,
            required,
            actual,
        }
    }

    /// Dimension mismatch.
    #[must_use]
    pub const fn dimension(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }
}
