use chrono::{DateTime, TimeZone, Utc};

use crate::aggregate::constants::PROCESS_INFO;
use crate::core::metrics::{MetricPoint, TAG_NAME, TAG_PID};

/// Base instant used by unit tests: 2023-11-14T22:13:20Z
pub const BASE_MS: i64 = 1_700_000_000_000;

pub fn at(offset_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(BASE_MS + offset_ms).unwrap()
}

pub fn point(offset_ms: i64, measurement: &str, field: &str, value: f64) -> MetricPoint {
    MetricPoint::new(at(offset_ms), measurement, field, value)
}

pub fn process_point(offset_ms: i64, pid: u32, name: &str, field: &str, value: f64) -> MetricPoint {
    point(offset_ms, PROCESS_INFO, field, value).with_tag(TAG_PID, pid.to_string()).with_tag(TAG_NAME, name)
}
