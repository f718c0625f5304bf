//! # Core Types Module
//!
//! Small value types shared by the aggregation, ranking and alerting stages.
//!
//! ## Key Types
//!
//! * `Percentage` - A percentage clamped to 0.0..=100.0
//! * `BucketKey` - The whole-second key used to merge samples taken at the same moment
//! * `BucketLabel` - How a bucket is rendered as a time-of-day string
//! * `FieldClass` - The display precision class of a field
//!
//! ## Example
//!
//! ```rust
//! use systempulse::core::types::{round_to, FieldClass};
//!
//! assert_eq!(round_to(12.346, 2), 12.35);
//! assert_eq!(FieldClass::Throughput.decimals(), Some(2));
//! ```

use chrono::{DateTime, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a percentage value between 0.0 and 100.0
///
/// # Examples
///
/// ```rust
/// use systempulse::core::types::Percentage;
///
/// let p = Percentage::new(75.0).unwrap();
/// assert_eq!(p.as_f64(), 75.0);
///
/// // Values outside 0-100 range return None
/// assert!(Percentage::new(150.0).is_none());
/// assert_eq!(Percentage::from_f64(125.0).as_f64(), 100.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(pub f64);

impl Percentage {
    /// Creates a new Percentage from a value between 0 and 100
    /// Returns None if the value is outside the valid range
    pub fn new(value: f64) -> Option<Self> {
        if (0.0..=100.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the percentage value as a float
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Create a new percentage value, clamping it to the range 0.0-100.0
    pub fn from_f64(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// Whole-second bucket a sample is merged into
///
/// Two instants share a key exactly when they fall in the same epoch second, so samples
/// a few milliseconds apart collide and samples in different seconds never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(pub i64);

impl BucketKey {
    /// Key for the second containing `time`
    pub fn from_time(time: &DateTime<Utc>) -> Self {
        Self(time.timestamp_millis().div_euclid(1000))
    }

    /// Seconds since the Unix epoch
    pub fn seconds(&self) -> i64 {
        self.0
    }
}

/// Truncates an instant to the start of its bucket second
pub fn bucket_start(time: &DateTime<Utc>) -> DateTime<Utc> {
    time.with_nanosecond(0).unwrap_or(*time)
}

/// Time zone used when rendering a bucket as a time-of-day label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketLabel {
    /// `HH:MM:SS` in UTC
    #[default]
    Utc,
    /// `HH:MM:SS` in the host's local zone
    Local,
}

impl BucketLabel {
    /// Renders `time` as `HH:MM:SS`
    pub fn render(&self, time: &DateTime<Utc>) -> String {
        match self {
            Self::Utc => time.format("%H:%M:%S").to_string(),
            Self::Local => time.with_timezone(&Local).format("%H:%M:%S").to_string(),
        }
    }
}

/// Display precision class of a metric field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldClass {
    /// Percent values such as `usage_pct`
    Percentage,
    /// Memory amounts in MB
    Megabytes,
    /// Transfer rates in MB/s
    Throughput,
    /// I/O operations per second
    Iops,
    /// Run-queue load averages
    LoadAverage,
    /// Monotonic or per-interval counters
    Counter,
    /// Durations in seconds
    Seconds,
    /// Anything the catalogue does not know about
    Unclassified,
}

impl FieldClass {
    /// Decimal places kept for this class, `None` when values pass through untouched
    pub fn decimals(&self) -> Option<u32> {
        match self {
            Self::Percentage | Self::Megabytes | Self::Iops => Some(1),
            Self::Throughput | Self::LoadAverage => Some(2),
            Self::Counter | Self::Seconds | Self::Unclassified => None,
        }
    }

    /// Rounds `value` to the precision of this class
    pub fn apply(&self, value: f64) -> f64 {
        match self.decimals() {
            Some(decimals) => round_to(value, decimals),
            None => value,
        }
    }
}

/// Rounds half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
