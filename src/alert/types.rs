use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// How a reading is compared with a rule's threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparator {
    /// Breached when the reading is strictly above the threshold
    #[default]
    #[serde(rename = ">")]
    Above,
    /// Breached when the reading is at or above the threshold
    #[serde(rename = ">=")]
    AtLeast,
    /// Breached when the reading is strictly below the threshold
    #[serde(rename = "<")]
    Below,
    /// Breached when the reading is at or below the threshold
    #[serde(rename = "<=")]
    AtMost,
}

impl Comparator {
    /// Whether `value` breaches `threshold`
    pub fn breached(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Above => value > threshold,
            Self::AtLeast => value >= threshold,
            Self::Below => value < threshold,
            Self::AtMost => value <= threshold,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Above => write!(f, ">"),
            Self::AtLeast => write!(f, ">="),
            Self::Below => write!(f, "<"),
            Self::AtMost => write!(f, "<="),
        }
    }
}

/// A threshold rule on one measurement field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique rule identifier
    pub id: String,
    /// Measurement family the rule reads
    pub measurement: String,
    /// Field within the family
    pub field: String,
    /// Value the reading is compared against
    pub threshold: f64,
    /// Comparison applied, `>` unless configured otherwise
    #[serde(default)]
    pub comparator: Comparator,
    /// Minimum time between two fire events of this rule
    #[serde(default, alias = "cooldownMs")]
    pub cooldown_ms: u64,
    /// Human-readable title, e.g. `High CPU Usage`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Unit appended to the reading, e.g. `%`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl AlertRule {
    /// Creates a `>` rule with no cooldown
    pub fn new(id: impl Into<String>, measurement: impl Into<String>, field: impl Into<String>, threshold: f64) -> Self {
        Self {
            id: id.into(),
            measurement: measurement.into(),
            field: field.into(),
            threshold,
            comparator: Comparator::default(),
            cooldown_ms: 0,
            label: None,
            unit: None,
        }
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Cooldown as a signed span; values beyond the representable range saturate
    pub fn cooldown(&self) -> TimeDelta {
        i64::try_from(self.cooldown_ms).ok().and_then(TimeDelta::try_milliseconds).unwrap_or(TimeDelta::MAX)
    }

    /// Renders the notification text for `value`, e.g. `High CPU Usage: 91.2%`
    pub fn message(&self, value: f64) -> String {
        let label = self.label.as_deref().unwrap_or(&self.id);
        let unit = self.unit.as_deref().unwrap_or("");
        format!("{label}: {value:.1}{unit}")
    }
}

/// Per-rule state carried across cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlertState {
    /// Whether the rule is currently breached
    pub active: bool,
    /// When the rule last emitted a fire event
    pub last_fired_at: Option<DateTime<Utc>>,
}

/// Notification produced by one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// Rule that produced the event
    pub rule_id: String,
    /// Always `true` for fire events; clearing is silent
    pub fired: bool,
    /// Reading that breached the threshold
    pub value: f64,
    /// Display text
    pub message: String,
    /// Evaluation instant
    pub at: DateTime<Utc>,
}
