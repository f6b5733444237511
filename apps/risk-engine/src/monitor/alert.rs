//! Alert state and its transitions.
//!
//! ```text
//!        value > threshold
//!   OK ───────────────────► BREACHED ──► acknowledged (flag, status unchanged)
//!    ▲                          │
//!    └──────────────────────────┘
//!        value <= threshold (auto-clear)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::limits::{LimitId, Severity};

/// Breach status of a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// Within limit.
    Ok,
    /// Limit exceeded.
    Breached,
}

/// Current state of one limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    /// Limit.
    pub limit: LimitId,
    /// Breach severity.
    pub severity: Severity,
    /// Latest evaluated value.
    pub current_value: f64,
    /// Configured threshold.
    pub threshold: f64,
    /// Whether the limit is breached.
    pub breached: bool,
    /// When the current breach began.
    pub breached_at: Option<DateTime<Utc>>,
    /// Whether the current breach has been acknowledged.
    pub acknowledged: bool,
    /// When the acknowledgment was made.
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Last evaluation time.
    pub evaluated_at: DateTime<Utc>,
    /// The value is carried over or derived from stale inputs.
    pub stale: bool,
}

impl AlertState {
    /// Status derived from the breach flag.
    #[must_use]
    pub const fn status(&self) -> AlertStatus {
        if self.breached {
            AlertStatus::Breached
        } else {
            AlertStatus::Ok
        }
    }

    /// `current_value / threshold`.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.threshold > 0.0 {
            self.current_value / self.threshold
        } else {
            0.0
        }
    }
}

/// A breach transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitTransition {
    /// Limit.
    pub limit: LimitId,
    /// Severity.
    pub severity: Severity,
    /// Value that triggered the transition.
    pub value: f64,
    /// Threshold at the time.
    pub threshold: f64,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// An acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitAcknowledged {
    /// Limit.
    pub limit: LimitId,
    /// Breach status at acknowledgment time.
    pub breached: bool,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// Audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    /// OK → BREACHED.
    Breached(LimitTransition),
    /// BREACHED → OK.
    Cleared(LimitTransition),
    /// Acknowledgment flag set.
    Acknowledged(LimitAcknowledged),
}

impl AuditEvent {
    /// Limit the event concerns.
    #[must_use]
    pub const fn limit(&self) -> &LimitId {
        match self {
            Self::Breached(e) | Self::Cleared(e) => &e.limit,
            Self::Acknowledged(e) => &e.limit,
        }
    }

    /// When the event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Breached(e) | Self::Cleared(e) => e.occurred_at,
            Self::Acknowledged(e) => e.occurred_at,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Breached(_) => "breached",
            Self::Cleared(_) => "cleared",
            Self::Acknowledged(_) => "acknowledged",
        }
    }
}

/// One observation of a limit's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// A fresh value; `stale` marks values derived from stale market data.
    Value {
        /// Observed value.
        value: f64,
        /// Derived from stale inputs.
        stale: bool,
    },
    /// No value could be computed this pass.
    Missing,
}

/// Advance a limit's state by one evaluation.
///
/// Returns the new state and the transition it caused, if any. A missing
/// observation keeps the previous value and status and flags the state stale.
#[must_use]
pub fn advance(
    previous: Option<&AlertState>,
    limit: &LimitId,
    threshold: f64,
    observation: Observation,
    now: DateTime<Utc>,
) -> (AlertState, Option<AuditEvent>) {
    let (value, stale) = match observation {
        Observation::Value { value, stale } => (value, stale),
        Observation::Missing => {
            let state = previous.map_or_else(
                || AlertState {
                    limit: limit.clone(),
                    severity: limit.severity(),
                    current_value: 0.0,
                    threshold,
                    breached: false,
                    breached_at: None,
                    acknowledged: false,
                    acknowledged_at: None,
                    evaluated_at: now,
                    stale: true,
                },
                |prev| AlertState {
                    threshold,
                    evaluated_at: now,
                    stale: true,
                    ..prev.clone()
                },
            );
            return (state, None);
        }
    };

    let was_breached = previous.is_some_and(|p| p.breached);
    let is_breached = value > threshold;
    let transition = LimitTransition {
        limit: limit.clone(),
        severity: limit.severity(),
        value,
        threshold,
        occurred_at: now,
    };

    let mut state = AlertState {
        limit: limit.clone(),
        severity: limit.severity(),
        current_value: value,
        threshold,
        breached: is_breached,
        breached_at: None,
        acknowledged: previous.is_some_and(|p| p.acknowledged),
        acknowledged_at: previous.and_then(|p| p.acknowledged_at),
        evaluated_at: now,
        stale,
    };

    let event = match (was_breached, is_breached) {
        (false, true) => {
            state.breached_at = Some(now);
            state.acknowledged = false;
            state.acknowledged_at = None;
            Some(AuditEvent::Breached(transition))
        }
        (true, true) => {
            state.breached_at = previous.and_then(|p| p.breached_at);
            None
        }
        (true, false) => Some(AuditEvent::Cleared(transition)),
        (false, false) => None,
    };
    (state, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn observe(value: f64) -> Observation {
        Observation::Value { value, stale: false }
    }

    #[test]
    fn test_breach_then_clear() {
        let t0 = Utc::now();
        let limit = LimitId::PortfolioVar;
        let (s1, e1) = advance(None, &limit, 10e6, observe(12e6), t0);
        assert!(s1.breached);
        assert_eq!(s1.breached_at, Some(t0));
        assert!(matches!(e1, Some(AuditEvent::Breached(_))));

        let t1 = t0 + TimeDelta::seconds(60);
        let (s2, e2) = advance(Some(&s1), &limit, 10e6, observe(11e6), t1);
        assert!(s2.breached);
        assert_eq!(s2.breached_at, Some(t0));
        assert!(e2.is_none());

        let (s3, e3) = advance(Some(&s2), &limit, 10e6, observe(9e6), t1);
        assert!(!s3.breached);
        assert_eq!(s3.breached_at, None);
        assert!(matches!(e3, Some(AuditEvent::Cleared(_))));
    }

    #[test]
    fn test_equal_to_threshold_is_not_breach() {
        let (s, e) = advance(None, &LimitId::PortfolioVar, 100.0, observe(100.0), Utc::now());
        assert!(!s.breached);
        assert!(e.is_none());
    }

    #[test]
    fn test_missing_keeps_previous() {
        let now = Utc::now();
        let (s1, _) = advance(None, &LimitId::PortfolioVar, 10.0, observe(12.0), now);
        let (s2, e2) = advance(Some(&s1), &LimitId::PortfolioVar, 10.0, Observation::Missing, now);
        assert!(s2.breached);
        assert!(s2.stale);
        assert_eq!(s2.current_value, 12.0);
        assert!(e2.is_none());
    }

    #[test]
    fn test_acknowledgment_resets_on_new_episode() {
        let now = Utc::now();
        let (mut s, _) = advance(None, &LimitId::PortfolioVar, 10.0, observe(12.0), now);
        s.acknowledged = true;
        let (s, _) = advance(Some(&s), &LimitId::PortfolioVar, 10.0, observe(13.0), now);
        assert!(s.acknowledged);
        let (s, _) = advance(Some(&s), &LimitId::PortfolioVar, 10.0, observe(5.0), now);
        let (s, _) = advance(Some(&s), &LimitId::PortfolioVar, 10.0, observe(15.0), now);
        assert!(s.breached);
        assert!(!s.acknowledged);
    }

    #[test]
    fn test_event_serde_tag() {
        let event = AuditEvent::Acknowledged(LimitAcknowledged {
            limit: LimitId::PortfolioVar,
            breached: true,
            occurred_at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ACKNOWLEDGED");
        assert_eq!(event.event_type(), "acknowledged");
    }
}
