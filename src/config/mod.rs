//! Pipeline configuration (JSON)
//!
//! ```json
//! {
//!   "poll_interval_ms": 5000,
//!   "core_count": 12,
//!   "top_n": 10,
//!   "rules": [
//!     {"id": "high_cpu", "measurement": "cpu_usage", "field": "usage_pct",
//!      "threshold": 90, "cooldown_ms": 60000, "label": "High CPU Usage", "unit": "%"}
//!   ]
//! }
//! ```
//!
//! `core_count` has no default: normalizing by a guessed core count would silently change
//! what the process table shows. camelCase keys (`pollIntervalMs`, `coreCount`, `topN`,
//! `cooldownMs`) are accepted as aliases.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::constants::{CPU_USAGE, SYSTEM_LOAD};
use crate::aggregate::is_known_field;
use crate::alert::{AlertEngine, AlertRule};
use crate::core::types::BucketLabel;
use crate::error::{Error, Result};
use crate::process::DEFAULT_TOP_N;

/// Default interval between poll cycles (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default cooldown of the built-in rules (milliseconds)
pub const DEFAULT_RULE_COOLDOWN_MS: u64 = 60_000;

/// Built-in CPU threshold (percent)
pub const DEFAULT_CPU_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_poll_interval_ms", alias = "pollIntervalMs")]
    pub poll_interval_ms: u64,
    /// Logical cores used to normalize per-process CPU; signed so a negative value is
    /// reported as a configuration error rather than a parse error
    #[serde(alias = "coreCount")]
    pub core_count: i64,
    #[serde(default = "default_top_n", alias = "topN")]
    pub top_n: i64,
    /// Alert rules; the built-in set when omitted
    #[serde(default)]
    pub rules: Option<Vec<AlertRule>>,
    /// Time zone for bucket labels
    #[serde(default)]
    pub bucket_label: BucketLabel,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_top_n() -> i64 {
    DEFAULT_TOP_N as i64
}

impl Config {
    /// Configuration with defaults for everything except the core count
    pub fn new(core_count: usize) -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            core_count: core_count as i64,
            top_n: DEFAULT_TOP_N as i64,
            rules: None,
            bucket_label: BucketLabel::default(),
        }
    }

    /// Parses and validates a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| Error::invalid_configuration(format!("malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        info!(path = %path.display(), rules = config.alert_rules().len(), "loaded configuration");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Rejects settings that would change what gets displayed
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] for a non-positive core count, top-N or poll
    /// interval, or for malformed alert rules.
    pub fn validate(&self) -> Result<()> {
        if self.core_count <= 0 {
            return Err(Error::invalid_configuration(format!(
                "core_count must be a positive integer, got {}",
                self.core_count
            )));
        }
        if self.top_n <= 0 {
            return Err(Error::invalid_configuration(format!("top_n must be a positive integer, got {}", self.top_n)));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::invalid_configuration("poll_interval_ms must be positive"));
        }
        AlertEngine::new(self.alert_rules()).map(|_| ())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Core count as validated by [`Config::validate`]
    pub fn cores(&self) -> usize {
        self.core_count.max(0) as usize
    }

    /// Table length as validated by [`Config::validate`]
    pub fn limit(&self) -> usize {
        self.top_n.max(0) as usize
    }

    /// Configured rules, or the built-in set
    pub fn alert_rules(&self) -> Vec<AlertRule> {
        self.rules.clone().unwrap_or_else(|| Self::default_rules(self.cores()))
    }

    /// Rules whose selector the aggregator never emits
    ///
    /// These are reported but not fatal: the rule stays configured and never fires.
    pub fn unknown_fields(&self) -> Vec<Error> {
        self.alert_rules()
            .iter()
            .filter(|rule| !is_known_field(&rule.measurement, &rule.field))
            .map(|rule| Error::unknown_field(&rule.measurement, &rule.field))
            .collect()
    }

    /// CPU above 90% and 1-minute load above one runnable task per core
    pub fn default_rules(core_count: usize) -> Vec<AlertRule> {
        vec![
            AlertRule::new("high_cpu", CPU_USAGE, "usage_pct", DEFAULT_CPU_THRESHOLD)
                .with_cooldown_ms(DEFAULT_RULE_COOLDOWN_MS)
                .with_label("High CPU Usage")
                .with_unit("%"),
            AlertRule::new("high_load", SYSTEM_LOAD, "load_1m", core_count as f64)
                .with_cooldown_ms(DEFAULT_RULE_COOLDOWN_MS)
                .with_label("High System Load"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Comparator;

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_json_str(r#"{"core_count": 12}"#).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.limit(), 10);
        assert_eq!(config.cores(), 12);
        assert_eq!(config.bucket_label, BucketLabel::Utc);

        let rules = config.alert_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].threshold, 12.0);
        assert!(config.unknown_fields().is_empty());
    }

    #[test]
    fn test_camel_case_aliases() {
        let config = Config::from_json_str(
            r#"{"pollIntervalMs": 1000, "coreCount": 4, "topN": 3,
                "rules": [{"id": "r", "measurement": "cpu_usage", "field": "usage_pct",
                           "threshold": 80, "comparator": ">=", "cooldownMs": 250}]}"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.limit(), 3);
        let rules = config.alert_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].comparator, Comparator::AtLeast);
        assert_eq!(rules[0].cooldown_ms, 250);
    }

    #[test]
    fn test_core_count_is_required() {
        assert!(matches!(Config::from_json_str(r#"{"top_n": 5}"#), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_non_positive_values() {
        for doc in [
            r#"{"core_count": 0}"#,
            r#"{"core_count": -4}"#,
            r#"{"core_count": 4, "top_n": 0}"#,
            r#"{"core_count": 4, "poll_interval_ms": 0}"#,
        ] {
            assert!(matches!(Config::from_json_str(doc), Err(Error::InvalidConfiguration(_))), "{doc}");
        }
    }

    #[test]
    fn test_rejects_duplicate_rule_ids() {
        let doc = r#"{"core_count": 4, "rules": [
            {"id": "a", "measurement": "cpu_usage", "field": "usage_pct", "threshold": 1},
            {"id": "a", "measurement": "cpu_usage", "field": "usage_pct", "threshold": 2}
        ]}"#;
        assert!(matches!(Config::from_json_str(doc), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unknown_rule_field_is_not_fatal() {
        let doc = r#"{"core_count": 4, "rules": [
            {"id": "fan", "measurement": "sensors", "field": "fan_rpm", "threshold": 4000}
        ]}"#;
        let config = Config::from_json_str(doc).unwrap();
        let unknown = config.unknown_fields();
        assert_eq!(unknown.len(), 1);
        assert!(matches!(&unknown[0], Error::UnknownField { field, .. } if field == "fan_rpm"));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("systempulse-config-{}", std::process::id())).join("config.json");
        let config = Config::new(8);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
