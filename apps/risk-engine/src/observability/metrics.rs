//! Prometheus metrics for the risk engine.
//!
//! Gauges for VaR and limit utilization, counters for breach transitions and
//! calculation failures, and a histogram of evaluation pass latency.
//!
//! # Example
//!
//! ```ignore
//! use risk_engine::observability::{init_metrics, MetricsExporterConfig};
//!
//! let config = MetricsExporterConfig::default();
//! init_metrics(&config)?;
//!
//! record_var("portfolio", "historical", 0.95, 2_750_000.0);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::config::MetricsConfig;

/// Exporter settings.
#[derive(Debug, Clone)]
pub struct MetricsExporterConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for pass latency (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsExporterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9464)),
            // 1ms to 30s
            latency_buckets: vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        }
    }
}

impl MetricsExporterConfig {
    /// Build from the `observability.metrics` section.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Configuration` for an unparsable address.
    pub fn from_config(config: &MetricsConfig) -> Result<Self, MetricsError> {
        let listen_addr = config
            .listen_addr
            .parse()
            .map_err(|e| MetricsError::Configuration(format!("listen_addr: {e}")))?;
        Ok(Self {
            listen_addr,
            ..Self::default()
        })
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsExporterConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Risk Metrics
// ============================================================================

/// Record a computed VaR figure.
///
/// # Arguments
///
/// * `scope` - `portfolio` or a commodity id
/// * `method` - VaR methodology
/// * `confidence` - Confidence level
/// * `value` - VaR in currency
pub fn record_var(scope: &str, method: &str, confidence: f64, value: f64) {
    gauge!(
        "risk_var_value",
        "scope" => scope.to_string(),
        "method" => method.to_string(),
        "confidence" => format!("{confidence:.2}")
    )
    .set(value);
}

/// Record a stressed VaR figure.
pub fn record_stressed_var(scenario: &str, confidence: f64, value: f64) {
    gauge!(
        "risk_stressed_var_value",
        "scenario" => scenario.to_string(),
        "confidence" => format!("{confidence:.2}")
    )
    .set(value);
}

/// Record a calculation that failed and was skipped.
pub fn record_calculation_error(operation: &str, code: &str) {
    counter!(
        "risk_calculation_errors_total",
        "operation" => operation.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record an evaluation pass.
pub fn record_pass(duration_seconds: f64, stale_inputs: usize) {
    histogram!("risk_pass_duration_seconds").record(duration_seconds);
    counter!("risk_passes_total").increment(1);
    gauge!("risk_stale_inputs").set(stale_inputs as f64);
}

/// Record the portfolio's total value.
pub fn record_portfolio_value(total_value: f64) {
    gauge!("portfolio_total_value").set(total_value);
}

// ============================================================================
// Limit Monitoring Metrics
// ============================================================================

/// Record current value / threshold for a limit.
pub fn record_limit_utilization(limit: &str, utilization: f64) {
    gauge!("limit_utilization_ratio", "limit" => limit.to_string()).set(utilization);
}

/// Record an alert state transition.
///
/// # Arguments
///
/// * `limit` - Limit identifier
/// * `transition` - `breached`, `cleared` or `acknowledged`
pub fn record_alert_transition(limit: &str, transition: &str) {
    counter!(
        "limit_transitions_total",
        "limit" => limit.to_string(),
        "transition" => transition.to_string()
    )
    .increment(1);
}

/// Record how many limits are currently breached.
pub fn record_active_breaches(count: usize) {
    gauge!("limit_active_breaches").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsExporterConfig::default();
        assert_eq!(config.listen_addr.port(), 9464);
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn test_from_config_rejects_bad_address() {
        let bad = MetricsConfig {
            enabled: true,
            listen_addr: "not-an-address".to_string(),
        };
        assert!(MetricsExporterConfig::from_config(&bad).is_err());
        let good = MetricsConfig {
            enabled: true,
            listen_addr: "127.0.0.1:9100".to_string(),
        };
        assert_eq!(MetricsExporterConfig::from_config(&good).unwrap().listen_addr.port(), 9100);
    }

    #[test]
    fn test_recording_without_exporter_is_noop() {
        // With no recorder installed the facade discards values.
        record_var("portfolio", "historical", 0.95, 1.0);
        record_alert_transition("portfolio_var", "breached");
        record_pass(0.01, 0);
    }
}
