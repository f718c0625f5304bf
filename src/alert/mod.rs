//! Threshold alerting with cooldown
//!
//! Each [`AlertRule`] watches one measurement field. Per rule the engine keeps an
//! [`AlertState`] with two states, cleared and active:
//!
//! - cleared -> active when the reading breaches the threshold and the cooldown since the
//!   last fire has elapsed; emits one fire event
//! - active -> active while breached: silent within the cooldown, fires again once the
//!   cooldown has elapsed
//! - active -> cleared when the reading stops breaching; silent
//!
//! A rule with no reading this cycle keeps its state. A collector gap is not a recovery.
//!
//! # Examples
//!
//! ```rust
//! use std::collections::HashMap;
//! use chrono::{TimeZone, Utc};
//! use systempulse::alert::{AlertEngine, AlertRule};
//!
//! let rule = AlertRule::new("high_cpu", "cpu_usage", "usage_pct", 90.0)
//!     .with_cooldown_ms(5_000)
//!     .with_label("High CPU Usage")
//!     .with_unit("%");
//! let mut engine = AlertEngine::new(vec![rule]).unwrap();
//!
//! let now = Utc.timestamp_millis_opt(0).unwrap();
//! let events = engine.evaluate(&HashMap::from([("high_cpu".to_string(), 91.2)]), now);
//! assert_eq!(events[0].message, "High CPU Usage: 91.2%");
//! ```

/// Rule, state and event types
pub mod types;


use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::aggregate::SeriesSet;
use crate::error::{Error, Result};

pub use types::{AlertEvent, AlertRule, AlertState, Comparator};

/// Evaluates alert rules and owns their cross-cycle state
#[derive(Debug, Clone)]
pub struct AlertEngine {
    rules: Vec<AlertRule>,
    states: HashMap<String, AlertState>,
}

impl AlertEngine {
    /// Creates an engine with every rule cleared
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for duplicate or empty rule ids, empty
    /// selectors and non-finite thresholds.
    pub fn new(rules: Vec<AlertRule>) -> Result<Self> {
        validate_rules(&rules)?;
        let states = rules.iter().map(|rule| (rule.id.clone(), AlertState::default())).collect();
        Ok(Self { rules, states })
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Current state of one rule
    pub fn state(&self, rule_id: &str) -> Option<&AlertState> {
        self.states.get(rule_id)
    }

    /// Copy of every rule's state
    pub fn snapshot(&self) -> HashMap<String, AlertState> {
        self.states.clone()
    }

    /// Latest reading per rule id from a cycle's aggregated series
    ///
    /// Rules whose field did not appear in the series are left out, so `evaluate` skips them.
    pub fn latest_values(&self, series: &SeriesSet) -> HashMap<String, f64> {
        self.rules
            .iter()
            .filter_map(|rule| series.latest(&rule.measurement, &rule.field).map(|value| (rule.id.clone(), value)))
            .collect()
    }

    /// Runs one evaluation pass and returns the fire events it produced
    ///
    /// # Arguments
    ///
    /// * `latest` - Current reading keyed by rule id
    /// * `now` - Evaluation instant, compared against each rule's last fire time
    pub fn evaluate(&mut self, latest: &HashMap<String, f64>, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for rule in &self.rules {
            let Some(&value) = latest.get(&rule.id) else {
                continue;
            };
            let state = self.states.entry(rule.id.clone()).or_default();

            if !rule.comparator.breached(value, rule.threshold) {
                state.active = false;
                continue;
            }

            let cooled_down = state.last_fired_at.map_or(true, |last| now.signed_duration_since(last) >= rule.cooldown());
            if !cooled_down {
                continue;
            }

            state.active = true;
            state.last_fired_at = Some(now);

            let event =
                AlertEvent { rule_id: rule.id.clone(), fired: true, value, message: rule.message(value), at: now };
            info!(rule = %event.rule_id, value, threshold = rule.threshold, "{}", event.message);
            events.push(event);
        }

        events
    }

    /// Reports rules whose selector is never observed
    ///
    /// Such rules stay configured and simply never fire.
    pub fn validate_fields<F>(&self, is_observed: F) -> Vec<Error>
    where
        F: Fn(&str, &str) -> bool,
    {
        self.rules
            .iter()
            .filter(|rule| !is_observed(&rule.measurement, &rule.field))
            .map(|rule| {
                warn!(rule = %rule.id, measurement = %rule.measurement, field = %rule.field, "alert rule can never fire");
                Error::unknown_field(&rule.measurement, &rule.field)
            })
            .collect()
    }
}

fn validate_rules(rules: &[AlertRule]) -> Result<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.id.trim().is_empty() {
            return Err(Error::invalid_configuration("alert rule id must not be empty"));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(Error::invalid_configuration(format!("duplicate alert rule id `{}`", rule.id)));
        }
        if rule.measurement.is_empty() || rule.field.is_empty() {
            return Err(Error::invalid_configuration(format!(
                "alert rule `{}` needs both a measurement and a field",
                rule.id
            )));
        }
        if !rule.threshold.is_finite() {
            return Err(Error::invalid_configuration(format!("alert rule `{}` has a non-finite threshold", rule.id)));
        }
    }
    Ok(())
}

/// Destination for fire events
///
/// Delivery transports (mail, chat bots, webhooks) implement this outside the crate.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, event: &AlertEvent) -> Result<()>;
}

/// Sink that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<()> {
        warn!(rule = %event.rule_id, value = event.value, at = %event.at, "ALERT {}", event.message);
        Ok(())
    }
}

/// Sink that forwards events into a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<AlertEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<AlertEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl AlertSink for ChannelSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<()> {
        self.tx.send(event.clone()).await.map_err(|_| Error::delivery("alert channel closed"))
    }
}
