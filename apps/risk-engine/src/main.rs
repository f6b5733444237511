//! Risk Engine Binary
//!
//! Runs monitoring passes over the configured book on a fixed interval,
//! pricing it from a seeded synthetic market.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin risk-engine -- config.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `RISK_ENGINE_CONFIG`: Config file path when no argument is given
//!   (default: config.yaml if present, else built-in defaults)
//! - `RUST_LOG`: Log filter, overrides `observability.logging.level`

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use risk_engine::config::{Config, load_config};
use risk_engine::engine::RiskEngine;
use risk_engine::market_data::SyntheticMarketData;
use risk_engine::monitor::AuditEvent;
use risk_engine::observability::{MetricsExporterConfig, init_metrics, init_tracing};
use risk_engine::report::RiskReport;
use tokio::signal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let config = read_config()?;
    init_tracing(&config.observability.logging)?;

    tracing::info!("Starting risk engine");

    if config.observability.metrics.enabled {
        let exporter = MetricsExporterConfig::from_config(&config.observability.metrics)?;
        init_metrics(&exporter)?;
    }

    let start = Utc::now() - chrono::Duration::days(config.market_data.history_days as i64);
    let market = Arc::new(
        SyntheticMarketData::generate(
            &config.universe,
            config.market_data.synthetic,
            config.market_data.history_days,
            start,
        )
        .context("failed to generate synthetic market data")?,
    );
    let interval = Duration::from_secs(config.engine.interval_secs);
    let engine = Arc::new(RiskEngine::from_config(config).context("failed to build risk engine")?);

    let shutdown = CancellationToken::new();
    let signals = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        signals.cancel();
    });
    let escalation = tokio::spawn(escalate(engine.monitor().subscribe(), shutdown.clone()));

    tracing::info!(interval_secs = interval.as_secs(), "Risk engine ready");

    let mut ticker = tokio::time::interval(interval);
    let mut first = true;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if !first {
                    market.advance();
                }
                first = false;

                let engine = Arc::clone(&engine);
                let market = Arc::clone(&market);
                let token = shutdown.child_token();
                let pass = tokio::task::spawn_blocking(move || {
                    engine.run_pass(market.as_ref(), Some(&token))
                });
                match pass.await {
                    Ok(Ok(report)) => log_report(&report),
                    Ok(Err(e)) => tracing::error!(error = %e, code = %e.code(), "Risk pass failed"),
                    Err(e) => tracing::error!(error = %e, "Risk pass task panicked"),
                }
            }
        }
    }

    let _ = escalation.await;
    tracing::info!("Risk engine stopped");
    Ok(())
}

/// Config from the first argument, `RISK_ENGINE_CONFIG`, `config.yaml`, or
/// built-in defaults, in that order.
fn read_config() -> anyhow::Result<Config> {
    let explicit = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RISK_ENGINE_CONFIG").ok());
    match explicit {
        Some(path) => load_config(Some(&path)).with_context(|| format!("loading {path}")),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(None).context("loading config.yaml")
        }
        None => Ok(Config::default()),
    }
}

/// Forward monitor transitions to the escalation log until shutdown.
async fn escalate(mut events: broadcast::Receiver<AuditEvent>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    tracing::info!(
                        event_type = event.event_type(),
                        limit = %event.limit(),
                        payload = %payload,
                        "Escalation"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Escalation consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

fn log_report(report: &RiskReport) {
    if let Some(risk) = &report.portfolio_risk {
        tracing::info!(
            total_value = %report.portfolio.total_value,
            var_95 = risk.var_95,
            var_99 = risk.var_99,
            es_95 = risk.es_95,
            volatility = risk.volatility,
            "Portfolio risk"
        );
    }
    for stress in &report.stress_results {
        tracing::info!(
            scenario = %stress.scenario,
            stressed_var_95 = stress.stressed_var_95,
            stressed_var_99 = stress.stressed_var_99,
            "Stress result"
        );
    }
    for recommendation in &report.recommendations {
        tracing::warn!(%recommendation, "Recommendation");
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; a process that cannot
/// receive termination signals should not start.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
