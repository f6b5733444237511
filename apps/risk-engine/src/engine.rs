//! Risk engine: one monitoring pass end to end.
//!
//! A pass refreshes marks from the market-data port, snapshots the book,
//! computes per-commodity, portfolio and stressed metrics on that snapshot
//! in parallel, runs the limit monitor and assembles a [`RiskReport`].
//!
//! Book mutations are serialized behind one lock; the lock is released
//! before any risk math runs.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{RiskError, RiskResult};
use crate::market_data::MarketDataPort;
use crate::models::{CommodityId, PriceSeries};
use crate::monitor::{AlertState, LimitId, MonitorSettings, RiskMonitor};
use crate::observability::{
    record_calculation_error, record_pass, record_portfolio_value, record_stressed_var, record_var,
};
use crate::portfolio::{PortfolioManager, PortfolioSummary, Position, Trade, sample_portfolio};
use crate::report::{
    CalculationFailure, CommodityRisk, REPORT_CONFIDENCE_HIGH, REPORT_CONFIDENCE_LOW, RiskFigures,
    RiskReport, StressResult, recommendations,
};
use crate::returns::{CorrelationMatrix, ReturnMatrix, returns_for};
use crate::risk::{
    MetricScope, MetricUnit, PortfolioInputs, RiskCalculator, RiskMetric, StressInput, VarMethod,
};

/// Orchestrates the portfolio manager, risk calculator and risk monitor.
#[derive(Debug)]
pub struct RiskEngine {
    config: Config,
    calculator: RiskCalculator,
    monitor: RiskMonitor,
    portfolio: Mutex<PortfolioManager>,
}

/// Market inputs gathered for one pass.
struct PassInputs {
    summary: PortfolioSummary,
    returns: Option<ReturnMatrix>,
    stale: BTreeSet<CommodityId>,
}

impl RiskEngine {
    /// Create an engine over an existing book.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the risk settings are invalid.
    pub fn new(config: Config, portfolio: PortfolioManager) -> RiskResult<Self> {
        let calculator = RiskCalculator::new(config.risk.clone())?;
        calculator.check_confidence(config.risk.monitor_confidence)?;
        let monitor = RiskMonitor::new(MonitorSettings {
            method: config.risk.monitor_method,
            confidence: config.risk.monitor_confidence,
        });
        Ok(Self {
            config,
            calculator,
            monitor,
            portfolio: Mutex::new(portfolio),
        })
    }

    /// Create an engine with the book described by `config.portfolio`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_config(config: Config) -> RiskResult<Self> {
        let settings = &config.portfolio;
        let mut book = if settings.use_sample {
            sample_portfolio(settings.exposure_convention)
        } else {
            PortfolioManager::new(settings.exposure_convention)
        };
        book.set_cash(settings.cash);
        Self::new(config, book)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Risk calculator.
    #[must_use]
    pub const fn calculator(&self) -> &RiskCalculator {
        &self.calculator
    }

    /// Limit monitor.
    #[must_use]
    pub const fn monitor(&self) -> &RiskMonitor {
        &self.monitor
    }

    /// Apply a trade to the book.
    pub fn apply_trade(&self, trade: Trade) -> Position {
        self.portfolio.lock().apply_trade(trade)
    }

    /// Current book summary.
    #[must_use]
    pub fn portfolio_summary(&self) -> PortfolioSummary {
        self.portfolio.lock().portfolio_summary()
    }

    /// Trades applied so far, oldest first.
    #[must_use]
    pub fn trade_history(&self) -> Vec<Trade> {
        self.portfolio.lock().trade_history().to_vec()
    }

    /// Acknowledge a breached limit.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a limit the monitor has never evaluated.
    pub fn acknowledge(&self, limit: &LimitId) -> RiskResult<AlertState> {
        self.monitor.acknowledge(limit)
    }

    /// Run one monitoring pass.
    ///
    /// Individual calculation failures are logged, counted and listed in the
    /// report; the pass continues without them.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if `cancel` fires before or during the pass.
    pub fn run_pass(
        &self,
        market: &dyn MarketDataPort,
        cancel: Option<&CancellationToken>,
    ) -> RiskResult<RiskReport> {
        let started = Instant::now();
        ensure_not_cancelled(cancel)?;
        let mut failures = Vec::new();

        let inputs = self.gather(market, &mut failures)?;
        let summary = &inputs.summary;
        let total_value = summary.total_value.to_f64().unwrap_or(0.0);
        info!(
            total_value,
            open_positions = summary.open_positions,
            stale = inputs.stale.len(),
            "Risk pass started"
        );

        let mut metrics = Vec::new();
        let mut stress_metrics = Vec::new();
        let mut commodity_risk = Vec::new();
        let mut portfolio_risk = None;
        let method = self.config.risk.monitor_method;

        if let Some(matrix) = &inputs.returns {
            let exposures: Vec<f64> = matrix
                .commodities()
                .iter()
                .map(|c| summary.exposure_of(c))
                .collect();
            let correlation = CorrelationMatrix::estimate(matrix);
            let portfolio = PortfolioInputs::new(&exposures, matrix, &correlation);
            let stale_portfolio = !inputs.stale.is_empty();

            for (label, result) in self.commodity_metrics(matrix, &exposures, cancel) {
                if let Some(metric) = absorb(result, &label, &mut failures)? {
                    let stale = match &metric.scope {
                        MetricScope::Commodity(c) => inputs.stale.contains(c),
                        MetricScope::Portfolio => stale_portfolio,
                    };
                    metrics.push(metric.with_stale(stale));
                }
            }
            for (label, result) in self.portfolio_metrics(&portfolio, cancel) {
                if let Some(metric) = absorb(result, &label, &mut failures)? {
                    metrics.push(metric.with_stale(stale_portfolio));
                }
            }
            for (label, result) in self.stress_metrics(&portfolio, cancel) {
                if let Some(metric) = absorb(result, &label, &mut failures)? {
                    stress_metrics.push(metric.with_stale(stale_portfolio));
                }
            }

            for (i, commodity) in matrix.commodities().iter().enumerate() {
                let position_value = exposures[i].abs();
                let volatility = self.calculator.annualized_volatility(matrix.column(i));
                let scope = MetricScope::Commodity(commodity.clone());
                if let Some(figures) =
                    RiskFigures::from_metrics(&metrics, &scope, method, position_value, volatility)
                {
                    commodity_risk.push(CommodityRisk {
                        commodity: commodity.clone(),
                        position_value,
                        figures,
                    });
                }
            }

            let portfolio_returns: Vec<f64> = if total_value.abs() > 0.0 {
                portfolio.pnl_series().iter().map(|pnl| pnl / total_value).collect()
            } else {
                Vec::new()
            };
            portfolio_risk = RiskFigures::from_metrics(
                &metrics,
                &MetricScope::Portfolio,
                method,
                total_value,
                self.calculator.annualized_volatility(&portfolio_returns),
            );
        }

        ensure_not_cancelled(cancel)?;
        let alerts = self.monitor.evaluate(summary, &metrics, &self.config.limits);
        let breaches: Vec<AlertState> = alerts.iter().filter(|a| a.breached).cloned().collect();
        let stress_results: Vec<StressResult> = self
            .config
            .scenarios
            .iter()
            .filter_map(|s| StressResult::from_metrics(s, &stress_metrics))
            .collect();
        let recommendations =
            recommendations(&breaches, &commodity_risk, self.config.engine.concentration_var);

        record_metrics(&metrics, &stress_metrics);
        record_portfolio_value(total_value);
        record_pass(started.elapsed().as_secs_f64(), inputs.stale.len());
        info!(
            metrics = metrics.len() + stress_metrics.len(),
            breaches = breaches.len(),
            failures = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Risk pass complete"
        );

        metrics.extend(stress_metrics);
        Ok(RiskReport {
            generated_at: Utc::now(),
            portfolio: inputs.summary,
            portfolio_risk,
            commodity_risk,
            stress_results,
            metrics,
            alerts,
            breaches,
            recommendations,
            failures,
        })
    }

    /// Refresh marks, snapshot the book and load aligned returns.
    fn gather(
        &self,
        market: &dyn MarketDataPort,
        failures: &mut Vec<CalculationFailure>,
    ) -> RiskResult<PassInputs> {
        let mut stale = BTreeSet::new();

        let (summary, open) = {
            let mut book = self.portfolio.lock();
            let held: Vec<CommodityId> = book.positions().map(|p| p.commodity.clone()).collect();
            for commodity in held {
                let quote = market.latest(&commodity);
                if quote.as_ref().is_some_and(|q| q.stale) {
                    stale.insert(commodity.clone());
                }
                if let Err(e) = book.update_market_value(&commodity, quote.map(|q| q.price)) {
                    stale.insert(commodity.clone());
                    absorb::<()>(Err(e), &format!("mark {commodity}"), failures)?;
                }
            }
            (book.portfolio_summary(), book.open_commodities())
        };
        stale.extend(summary.stale.iter().cloned());

        // A held commodity left out of the return matrix makes every
        // portfolio figure partial, so it counts as stale.
        let mut usable: Vec<PriceSeries> = Vec::with_capacity(open.len());
        for commodity in &open {
            let label = format!("history {commodity}");
            let Some(history) = absorb(
                market.history(commodity, self.config.market_data.history_days),
                &label,
                failures,
            )?
            else {
                stale.insert(commodity.clone());
                continue;
            };
            if absorb(returns_for(&history.series, self.config.risk.return_kind), &label, failures)?
                .is_none()
            {
                stale.insert(commodity.clone());
                continue;
            }
            if history.stale {
                stale.insert(commodity.clone());
            }
            usable.push(history.series);
        }

        let returns = if usable.is_empty() {
            None
        } else {
            absorb(
                ReturnMatrix::from_price_series(&usable, self.config.risk.return_kind),
                "return matrix",
                failures,
            )?
        };
        debug!(
            commodities = usable.len(),
            observations = returns.as_ref().map_or(0, ReturnMatrix::n_observations),
            "Market data loaded"
        );

        Ok(PassInputs {
            summary,
            returns,
            stale,
        })
    }

    fn commodity_metrics(
        &self,
        matrix: &ReturnMatrix,
        exposures: &[f64],
        cancel: Option<&CancellationToken>,
    ) -> Vec<(String, RiskResult<RiskMetric>)> {
        let jobs: Vec<(usize, VarMethod, f64)> = (0..matrix.n_assets())
            .flat_map(|i| self.grid().into_iter().map(move |(m, c)| (i, m, c)))
            .collect();
        jobs.into_par_iter()
            .map(|(i, method, confidence)| {
                let commodity = &matrix.commodities()[i];
                let result = self.calculator.commodity_metric(
                    commodity,
                    matrix.column(i),
                    exposures[i],
                    method,
                    confidence,
                    cancel,
                );
                (format!("{method} var {commodity} @ {confidence}"), result)
            })
            .collect()
    }

    fn portfolio_metrics(
        &self,
        inputs: &PortfolioInputs<'_>,
        cancel: Option<&CancellationToken>,
    ) -> Vec<(String, RiskResult<RiskMetric>)> {
        self.grid()
            .into_par_iter()
            .map(|(method, confidence)| {
                let result = self.calculator.portfolio_metric(inputs, method, confidence, cancel);
                (format!("{method} var portfolio @ {confidence}"), result)
            })
            .collect()
    }

    fn stress_metrics(
        &self,
        inputs: &PortfolioInputs<'_>,
        cancel: Option<&CancellationToken>,
    ) -> Vec<(String, RiskResult<RiskMetric>)> {
        let jobs: Vec<_> = self
            .config
            .scenarios
            .iter()
            .flat_map(|s| [(s, REPORT_CONFIDENCE_LOW), (s, REPORT_CONFIDENCE_HIGH)])
            .collect();
        jobs.into_par_iter()
            .map(|(scenario, confidence)| {
                let result = self.calculator.stress(
                    StressInput::Portfolio(*inputs),
                    scenario,
                    confidence,
                    cancel,
                );
                (format!("stress {} @ {confidence}", scenario.name), result)
            })
            .collect()
    }

    /// Every (method, confidence) pair the calculator is configured for.
    fn grid(&self) -> Vec<(VarMethod, f64)> {
        VarMethod::ALL
            .into_iter()
            .flat_map(|m| {
                self.config
                    .risk
                    .confidence_levels
                    .iter()
                    .map(move |&c| (m, c))
            })
            .collect()
    }
}

fn ensure_not_cancelled(cancel: Option<&CancellationToken>) -> RiskResult<()> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        Err(RiskError::Cancelled("risk pass"))
    } else {
        Ok(())
    }
}

/// Keep a successful value; log and list a failure. Cancellation aborts.
fn absorb<T>(
    result: RiskResult<T>,
    operation: &str,
    failures: &mut Vec<CalculationFailure>,
) -> RiskResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ RiskError::Cancelled(_)) => Err(e),
        Err(e) => {
            warn!(operation, code = %e.code(), error = %e, "Calculation skipped");
            record_calculation_error(operation, e.code().reason());
            failures.push(CalculationFailure::new(operation, &e));
            Ok(None)
        }
    }
}

fn record_metrics(metrics: &[RiskMetric], stress_metrics: &[RiskMetric]) {
    for m in metrics.iter().filter(|m| m.unit == MetricUnit::Currency) {
        record_var(&m.scope.to_string(), m.method.as_str(), m.confidence, m.var);
    }
    for m in stress_metrics {
        if let Some(scenario) = &m.scenario {
            record_stressed_var(scenario, m.confidence, m.var);
        }
    }
}
