//! # Core Metrics Module
//!
//! The raw and merged record types that flow through the pipeline.
//!
//! * `MetricPoint` - one tagged sample as produced by the collector
//! * `MergedRecord` - all fields of one measurement family that fell into the same bucket
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use systempulse::core::metrics::MetricPoint;
//!
//! let time = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
//! let point = MetricPoint::new(time, "process_info", "cpu_pct", 42.0)
//!     .with_tag("pid", "4242")
//!     .with_tag("name", "postgres");
//!
//! assert_eq!(point.pid(), Some(4242));
//! assert_eq!(point.tag("name"), Some("postgres"));
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{bucket_start, BucketKey, BucketLabel};

/// Tag key carrying the process id on `process_info` samples
pub const TAG_PID: &str = "pid";
/// Tag key carrying the process name on `process_info` samples
pub const TAG_NAME: &str = "name";
/// Tag key carrying the reporting host
pub const TAG_HOSTNAME: &str = "hostname";

/// A single raw measurement sample
///
/// Samples are immutable once produced. `tags` is empty for host-wide families and
/// always carries `pid` and `name` for process samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// When the collector took the sample (millisecond resolution)
    pub time: DateTime<Utc>,
    /// Measurement family, e.g. `cpu_usage`
    pub measurement: String,
    /// Quantity within the family, e.g. `usage_pct`
    pub field: String,
    /// Sampled value
    pub value: f64,
    /// Free-form string tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl MetricPoint {
    /// Creates an untagged sample
    pub fn new(time: DateTime<Utc>, measurement: impl Into<String>, field: impl Into<String>, value: f64) -> Self {
        Self { time, measurement: measurement.into(), field: field.into(), value, tags: BTreeMap::new() }
    }

    /// Adds or replaces a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Looks up a tag value
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Process id parsed from the `pid` tag
    pub fn pid(&self) -> Option<u32> {
        self.tag(TAG_PID).and_then(|pid| pid.trim().parse().ok())
    }

    /// Bucket this sample merges into
    pub fn bucket(&self) -> BucketKey {
        BucketKey::from_time(&self.time)
    }

    /// Whether this sample belongs to `measurement`/`field`
    pub fn is(&self, measurement: &str, field: &str) -> bool {
        self.measurement == measurement && self.field == field
    }
}

/// Every field of one measurement family observed in one bucket
///
/// Fields missing from the raw batch are absent, never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    /// Bucket the fields were merged under
    pub bucket: BucketKey,
    /// Start of the bucket second
    pub time: DateTime<Utc>,
    /// Time-of-day label for display
    pub label: String,
    /// Field values keyed by field name
    pub fields: BTreeMap<String, f64>,
}

impl MergedRecord {
    /// Creates an empty record for the bucket containing `time`
    pub fn new(time: &DateTime<Utc>, label: BucketLabel) -> Self {
        let start = bucket_start(time);
        Self { bucket: BucketKey::from_time(time), label: label.render(&start), time: start, fields: BTreeMap::new() }
    }

    /// Value of `field`, if observed in this bucket
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    /// Whether `field` was observed in this bucket
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Sets `field`, replacing any earlier value
    pub fn set(&mut self, field: impl Into<String>, value: f64) {
        self.fields.insert(field.into(), value);
    }

    /// Number of fields in the record
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record holds no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
