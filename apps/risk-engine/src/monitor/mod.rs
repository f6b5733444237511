//! Risk monitor.
//!
//! Compares currency VaR and position sizes against configured limits and
//! keeps a per-limit alert state machine with an audit trail of every
//! transition.

mod alert;
mod limits;
mod service;

pub use alert::{
    AlertState, AlertStatus, AuditEvent, LimitAcknowledged, LimitTransition, Observation, advance,
};
pub use limits::{LimitId, RiskLimits, Severity};
pub use service::{MonitorSettings, RiskMonitor};
