use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use systempulse::core::metrics::{MetricPoint, TAG_NAME, TAG_PID};

/// 2023-11-14T22:13:20Z
pub const BASE_MS: i64 = 1_700_000_000_000;

pub fn at(offset_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(BASE_MS + offset_ms).unwrap()
}

pub struct TestPointBuilder {
    offset_ms: i64,
    measurement: String,
    field: String,
    value: f64,
    pid: Option<u32>,
    name: Option<String>,
}

impl TestPointBuilder {
    pub fn new(measurement: &str, field: &str) -> Self {
        Self {
            offset_ms: 0,
            measurement: measurement.to_string(),
            field: field.to_string(),
            value: 0.0,
            pid: None,
            name: None,
        }
    }

    pub fn process(pid: u32, name: &str, field: &str) -> Self {
        let mut builder = Self::new("process_info", field);
        builder.pid = Some(pid);
        builder.name = Some(name.to_string());
        builder
    }

    pub fn at(mut self, offset_ms: i64) -> Self {
        self.offset_ms = offset_ms;
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn build(self) -> MetricPoint {
        let mut point = MetricPoint::new(at(self.offset_ms), self.measurement, self.field, self.value);
        if let Some(pid) = self.pid {
            point = point.with_tag(TAG_PID, pid.to_string());
        }
        if let Some(name) = self.name {
            point = point.with_tag(TAG_NAME, name);
        }
        point
    }

    /// The collector's JSON rendering of the sample
    pub fn to_json(&self) -> Value {
        let mut record = json!({
            "time": at(self.offset_ms).format("%Y-%m-%d %H:%M:%S%.6f+00:00").to_string(),
            "measurement": self.measurement,
            "field": self.field,
            "value": self.value,
        });
        if let Some(pid) = self.pid {
            record["pid"] = json!(pid.to_string());
        }
        if let Some(name) = &self.name {
            record["name"] = json!(name);
        }
        record
    }
}

/// Wraps records in the collector's `{"data": [...]}` envelope
pub fn payload(records: &[TestPointBuilder]) -> String {
    json!({ "data": records.iter().map(TestPointBuilder::to_json).collect::<Vec<_>>() }).to_string()
}
