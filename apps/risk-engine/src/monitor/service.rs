//! Limit monitoring service.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::alert::{AlertState, AuditEvent, LimitAcknowledged, Observation, advance};
use super::limits::{LimitId, RiskLimits};
use crate::error::{RiskError, RiskResult};
use crate::models::CommodityId;
use crate::observability::{
    record_active_breaches, record_alert_transition, record_limit_utilization,
};
use crate::portfolio::PortfolioSummary;
use crate::risk::{MetricScope, MetricUnit, RiskMetric, VarMethod};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which metrics VaR limits are checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    /// VaR methodology.
    pub method: VarMethod,
    /// Confidence level.
    pub confidence: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            method: VarMethod::Historical,
            confidence: 0.95,
        }
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    alerts: BTreeMap<LimitId, AlertState>,
    audit: Vec<AuditEvent>,
}

/// Evaluates risk figures against limits and tracks breach state.
///
/// The alert table and audit trail sit behind one lock; every transition is
/// also published to subscribers.
#[derive(Debug)]
pub struct RiskMonitor {
    settings: MonitorSettings,
    state: Mutex<MonitorState>,
    events: broadcast::Sender<AuditEvent>,
}

impl Default for RiskMonitor {
    fn default() -> Self {
        Self::new(MonitorSettings::default())
    }
}

impl RiskMonitor {
    /// Create a monitor with an empty alert table.
    #[must_use]
    pub fn new(settings: MonitorSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            settings,
            state: Mutex::new(MonitorState::default()),
            events,
        }
    }

    /// Monitoring settings.
    #[must_use]
    pub const fn settings(&self) -> MonitorSettings {
        self.settings
    }

    /// Evaluate every limit once and return the full alert snapshot.
    ///
    /// Commodities considered are those with a position, a VaR metric or a
    /// configured limit.
    pub fn evaluate(
        &self,
        summary: &PortfolioSummary,
        metrics: &[RiskMetric],
        limits: &RiskLimits,
    ) -> Vec<AlertState> {
        let now = Utc::now();
        let commodities = self.commodities(summary, metrics, limits);
        let table = limits.table(&commodities);

        let mut state = self.state.lock();
        let mut snapshot = Vec::with_capacity(table.len());
        let mut events = Vec::new();

        for (limit, threshold) in table {
            let observation = self.observe(&limit, summary, metrics);
            let (next, event) = advance(state.alerts.get(&limit), &limit, threshold, observation, now);
            if next.stale {
                warn!(limit = %limit, value = next.current_value, "Limit evaluated on stale data");
            }
            record_limit_utilization(&limit.to_string(), next.utilization());
            if let Some(event) = event {
                events.push(event);
            }
            state.alerts.insert(limit, next.clone());
            snapshot.push(next);
        }

        for event in events {
            Self::publish(&self.events, &mut state.audit, event);
        }
        record_active_breaches(state.alerts.values().filter(|a| a.breached).count());
        snapshot
    }

    /// Acknowledge a limit's current breach.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the limit has never been evaluated.
    pub fn acknowledge(&self, limit: &LimitId) -> RiskResult<AlertState> {
        let now = Utc::now();
        let mut state = self.state.lock();
        let alert = state
            .alerts
            .get_mut(limit)
            .ok_or_else(|| RiskError::configuration(format!("unknown limit '{limit}'")))?;
        alert.acknowledged = true;
        alert.acknowledged_at = Some(now);
        let acknowledged = alert.clone();

        let event = AuditEvent::Acknowledged(LimitAcknowledged {
            limit: limit.clone(),
            breached: acknowledged.breached,
            occurred_at: now,
        });
        Self::publish(&self.events, &mut state.audit, event);
        Ok(acknowledged)
    }

    /// Current state of one limit.
    #[must_use]
    pub fn alert(&self, limit: &LimitId) -> Option<AlertState> {
        self.state.lock().alerts.get(limit).cloned()
    }

    /// Current state of every evaluated limit.
    #[must_use]
    pub fn alerts(&self) -> Vec<AlertState> {
        self.state.lock().alerts.values().cloned().collect()
    }

    /// Limits currently breached.
    #[must_use]
    pub fn breaches(&self) -> Vec<AlertState> {
        self.state
            .lock()
            .alerts
            .values()
            .filter(|a| a.breached)
            .cloned()
            .collect()
    }

    /// Every transition and acknowledgment so far, oldest first.
    #[must_use]
    pub fn audit_trail(&self) -> Vec<AuditEvent> {
        self.state.lock().audit.clone()
    }

    /// Receive audit events as they happen.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.events.subscribe()
    }

    fn commodities(
        &self,
        summary: &PortfolioSummary,
        metrics: &[RiskMetric],
        limits: &RiskLimits,
    ) -> BTreeSet<CommodityId> {
        let mut set: BTreeSet<CommodityId> =
            summary.positions.iter().map(|p| p.commodity.clone()).collect();
        set.extend(limits.commodity_var.keys().cloned());
        set.extend(limits.position_size.keys().cloned());
        set.extend(
            metrics
                .iter()
                .filter(|m| self.is_monitored(m))
                .filter_map(|m| match &m.scope {
                    MetricScope::Commodity(c) => Some(c.clone()),
                    MetricScope::Portfolio => None,
                }),
        );
        set
    }

    fn is_monitored(&self, metric: &RiskMetric) -> bool {
        metric.unit == MetricUnit::Currency
            && !metric.is_stressed()
            && metric.matches(self.settings.method, self.settings.confidence)
    }

    fn observe(
        &self,
        limit: &LimitId,
        summary: &PortfolioSummary,
        metrics: &[RiskMetric],
    ) -> Observation {
        match limit {
            LimitId::PortfolioVar => self.var_observation(
                &MetricScope::Portfolio,
                metrics,
                summary.open_positions == 0,
            ),
            LimitId::CommodityVar(commodity) => {
                let flat = summary
                    .position(commodity)
                    .is_none_or(|p| p.quantity.is_zero());
                self.var_observation(&MetricScope::Commodity(commodity.clone()), metrics, flat)
            }
            LimitId::PositionSize(commodity) => match summary.position(commodity) {
                Some(p) => match p.market_value.abs().to_f64() {
                    Some(value) => Observation::Value {
                        value,
                        stale: p.stale,
                    },
                    None => Observation::Missing,
                },
                None => Observation::Value {
                    value: 0.0,
                    stale: false,
                },
            },
        }
    }

    fn var_observation(&self, scope: &MetricScope, metrics: &[RiskMetric], flat: bool) -> Observation {
        let found = metrics
            .iter()
            .find(|m| &m.scope == scope && self.is_monitored(m));
        match found {
            Some(metric) => Observation::Value {
                value: metric.var,
                stale: metric.stale,
            },
            None if flat => Observation::Value {
                value: 0.0,
                stale: false,
            },
            None => Observation::Missing,
        }
    }

    fn publish(
        events: &broadcast::Sender<AuditEvent>,
        audit: &mut Vec<AuditEvent>,
        event: AuditEvent,
    ) {
        let limit = event.limit().to_string();
        match &event {
            AuditEvent::Breached(t) => warn!(
                limit = %limit,
                severity = ?t.severity,
                value = t.value,
                threshold = t.threshold,
                "Risk limit breached"
            ),
            AuditEvent::Cleared(t) => info!(
                limit = %limit,
                value = t.value,
                threshold = t.threshold,
                "Risk limit cleared"
            ),
            AuditEvent::Acknowledged(a) => info!(
                limit = %limit,
                breached = a.breached,
                "Risk limit acknowledged"
            ),
        }
        record_alert_transition(&limit, event.event_type());
        // No subscribers is not an error.
        let _ = events.send(event.clone());
        audit.push(event);
    }
}
