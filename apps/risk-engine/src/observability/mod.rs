//! Observability module for metrics and logging.
//!
//! Structured `tracing` output and Prometheus metrics export for the risk
//! engine.

mod metrics;
mod tracing;

pub use self::metrics::{
    MetricsError, MetricsExporterConfig, init_metrics, record_active_breaches,
    record_alert_transition, record_calculation_error, record_limit_utilization, record_pass,
    record_portfolio_value, record_stressed_var, record_var,
};
pub use self::tracing::{TracingError, env_filter, init_tracing};
