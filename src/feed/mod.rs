//! Sample feed boundary
//!
//! The collector and its transport live outside this crate. This module defines the seam
//! the poll cycle fetches through ([`SampleFeed`]) and the adapter that turns the
//! collector's JSON payload into canonical [`MetricPoint`]s.
//!
//! The collector serves records shaped like
//!
//! ```json
//! {"data": [
//!   {"time": "2023-11-14 22:13:20.250000+00:00", "measurement": "process_info",
//!    "field": "cpu_pct", "value": 612.0, "pid": "4242", "name": "postgres"}
//! ]}
//! ```
//!
//! Tags may arrive at the top level (`pid`, `name`, `hostname`) or nested under `tags`;
//! both are folded into [`MetricPoint::tags`]. Records that cannot be turned into a sample
//! are dropped and counted rather than failing the whole batch.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use mockall::automock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::metrics::{MetricPoint, TAG_HOSTNAME, TAG_NAME, TAG_PID};
use crate::error::{Error, Result};

/// Tags the collector may place beside the sample instead of under `tags`
const TOP_LEVEL_TAGS: [&str; 3] = [TAG_PID, TAG_NAME, TAG_HOSTNAME];

/// One fetched batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedBatch {
    /// Well-formed samples in payload order
    pub points: Vec<MetricPoint>,
    /// Records that were discarded as malformed
    pub dropped: usize,
}

/// Source of raw sample batches
#[automock]
#[async_trait]
pub trait SampleFeed: Send + Sync {
    /// Fetches the current batch
    ///
    /// Transport failures are reported as [`Error::FeedUnavailable`].
    async fn fetch(&self) -> Result<FeedBatch>;
}

/// Parses a collector payload
///
/// Accepts either the `{"data": [...]}` envelope or a bare array.
///
/// # Errors
///
/// Returns [`Error::Json`] when the text is not JSON and [`Error::InvalidData`] when it
/// is JSON of the wrong shape. Individual bad records never fail the batch.
pub fn parse_payload(payload: &str) -> Result<FeedBatch> {
    let root: Value = serde_json::from_str(payload)?;
    let records = match root {
        Value::Array(records) => records,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(records)) => records,
            _ => return Err(Error::invalid_data("payload object has no `data` array")),
        },
        _ => return Err(Error::invalid_data("payload is neither an object nor an array")),
    };

    let mut batch = FeedBatch { points: Vec::with_capacity(records.len()), dropped: 0 };
    for record in &records {
        match parse_record(record) {
            Some(point) => batch.points.push(point),
            None => batch.dropped += 1,
        }
    }

    if batch.dropped > 0 {
        debug!(dropped = batch.dropped, kept = batch.points.len(), "dropped malformed samples");
    }
    Ok(batch)
}

fn parse_record(record: &Value) -> Option<MetricPoint> {
    let object = record.as_object()?;
    let time = parse_time(object.get("time")?)?;
    let measurement = non_empty_str(object.get("measurement")?)?;
    let field = non_empty_str(object.get("field")?)?;
    let value = object.get("value")?.as_f64().filter(|v| v.is_finite())?;

    let mut point = MetricPoint::new(time, measurement, field, value);
    if let Some(Value::Object(tags)) = object.get("tags") {
        merge_tags(&mut point, tags);
    }
    for key in TOP_LEVEL_TAGS {
        if let Some(tag) = object.get(key).and_then(tag_string) {
            point.tags.insert(key.to_string(), tag);
        }
    }
    Some(point)
}

fn merge_tags(point: &mut MetricPoint, tags: &Map<String, Value>) {
    for (key, value) in tags {
        if let Some(tag) = tag_string(value) {
            point.tags.insert(key.clone(), tag);
        }
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn tag_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parses RFC 3339, the collector's `YYYY-MM-DD HH:MM:SS.ffffff+00:00` rendering, or
/// epoch milliseconds
fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_time_str(s),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Some(time.with_timezone(&Utc));
    }
    if let Ok(time) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok().map(|naive| naive.and_utc())
}

/// Feed that serves the same payload on every fetch
#[derive(Debug, Clone)]
pub struct StaticFeed {
    payload: String,
}

impl StaticFeed {
    pub fn new(payload: impl Into<String>) -> Self {
        Self { payload: payload.into() }
    }
}

#[async_trait]
impl SampleFeed for StaticFeed {
    async fn fetch(&self) -> Result<FeedBatch> {
        parse_payload(&self.payload)
    }
}

/// Feed that re-reads a payload file on every fetch
///
/// Useful when an external exporter periodically rewrites a snapshot file.
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SampleFeed for FileFeed {
    async fn fetch(&self) -> Result<FeedBatch> {
        let payload = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "sample feed read failed");
            Error::feed_unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        parse_payload(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::at;

    #[test]
    fn test_parse_envelope_with_top_level_tags() {
        let payload = r#"{"data": [
            {"time": "2023-11-14 22:13:20.250000+00:00", "measurement": "process_info",
             "field": "cpu_pct", "value": 612.0, "pid": 4242, "name": "postgres", "hostname": "db1"},
            {"time": "2023-11-14T22:13:20Z", "measurement": "cpu_usage", "field": "usage_pct", "value": 41.5}
        ]}"#;

        let batch = parse_payload(payload).unwrap();
        assert_eq!(batch.dropped, 0);
        assert_eq!(batch.points.len(), 2);

        let process = &batch.points[0];
        assert_eq!(process.time, at(250));
        assert_eq!(process.pid(), Some(4242));
        assert_eq!(process.tag("name"), Some("postgres"));
        assert_eq!(process.tag("hostname"), Some("db1"));

        assert_eq!(batch.points[1].time, at(0));
        assert!(batch.points[1].tags.is_empty());
    }

    #[test]
    fn test_parse_nested_tags_and_bare_array() {
        let payload = r#"[
            {"time": 1700000000500, "measurement": "process_info", "field": "mem_pct",
             "value": 3.25, "tags": {"pid": "7", "name": "sshd"}}
        ]"#;

        let batch = parse_payload(payload).unwrap();
        assert_eq!(batch.points.len(), 1);
        assert_eq!(batch.points[0].time, at(500));
        assert_eq!(batch.points[0].pid(), Some(7));
    }

    #[test]
    fn test_malformed_records_are_counted() {
        let payload = r#"{"data": [
            {"time": "2023-11-14T22:13:20Z", "measurement": "cpu_usage", "field": "usage_pct"},
            {"time": "2023-11-14T22:13:20Z", "measurement": "cpu_usage", "field": "usage_pct", "value": "high"},
            {"time": "yesterday", "measurement": "cpu_usage", "field": "usage_pct", "value": 1.0},
            {"time": "2023-11-14T22:13:20Z", "measurement": "", "field": "usage_pct", "value": 1.0},
            42,
            {"time": "2023-11-14T22:13:21Z", "measurement": "cpu_usage", "field": "usage_pct", "value": 9}
        ]}"#;

        let batch = parse_payload(payload).unwrap();
        assert_eq!(batch.dropped, 5);
        assert_eq!(batch.points.len(), 1);
        assert_eq!(batch.points[0].value, 9.0);
    }

    #[test]
    fn test_wrong_shape_is_invalid_data() {
        assert!(matches!(parse_payload(r#"{"rows": []}"#), Err(Error::InvalidData(_))));
        assert!(matches!(parse_payload("17"), Err(Error::InvalidData(_))));
        assert!(matches!(parse_payload("not json"), Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_static_feed_serves_payload() {
        let feed = StaticFeed::new(r#"{"data": []}"#);
        let batch = feed.fetch().await.unwrap();
        assert_eq!(batch, FeedBatch::default());
    }

    #[tokio::test]
    async fn test_file_feed_missing_file_is_unavailable() {
        let feed = FileFeed::new("/nonexistent/systempulse/payload.json");
        match feed.fetch().await {
            Err(Error::FeedUnavailable(msg)) => assert!(msg.contains("payload.json")),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_feed_reads_payload() {
        let path = std::env::temp_dir().join(format!("systempulse-feed-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"[{"time": 0, "measurement": "system_uptime", "field": "uptime_s", "value": 61}]"#)
            .await
            .unwrap();

        let batch = FileFeed::new(&path).fetch().await.unwrap();
        assert_eq!(batch.points.len(), 1);
        assert_eq!(batch.points[0].value, 61.0);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_mock_feed() {
        let mut feed = MockSampleFeed::new();
        feed.expect_fetch().times(1).returning(|| Err(Error::feed_unavailable("timeout")));
        assert!(matches!(feed.fetch().await, Err(Error::FeedUnavailable(_))));
    }
}
