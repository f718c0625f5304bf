//! Time-series aggregation
//!
//! Groups a flat batch of samples into one [`MergedRecord`] per measurement family and
//! bucket second, rounds each field to its display precision and fills derived fields.
//!
//! # Examples
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use systempulse::aggregate::TimeSeriesAggregator;
//! use systempulse::core::metrics::MetricPoint;
//!
//! let t = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
//! let samples = vec![
//!     MetricPoint::new(t, "memory_usage", "total_mb", 16000.0),
//!     MetricPoint::new(t, "memory_usage", "used_mb", 6000.0),
//! ];
//!
//! let records = TimeSeriesAggregator::new().aggregate(&samples, "memory_usage");
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].get("free_mb"), Some(10000.0));
//! ```

/// Measurement and field names plus the precision catalogue
pub mod constants;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::core::metrics::{MergedRecord, MetricPoint};
use crate::core::types::{round_to, BucketKey, BucketLabel};

pub use constants::{field_class, is_known_field, CHART_FAMILIES};

/// Builds per-bucket merged records from raw samples
///
/// The aggregator is stateless apart from its label style, so the same input always yields
/// the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesAggregator {
    label: BucketLabel,
}

impl TimeSeriesAggregator {
    /// Aggregator that labels buckets in UTC
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator with an explicit label style
    pub fn with_label(label: BucketLabel) -> Self {
        Self { label }
    }

    /// Merges every `measurement` sample into one record per bucket
    ///
    /// Records come back in the order their bucket was first seen. A field written twice
    /// in the same bucket keeps the later value.
    ///
    /// # Arguments
    ///
    /// * `samples` - The raw batch, in collector order
    /// * `measurement` - The family to extract
    pub fn aggregate(&self, samples: &[MetricPoint], measurement: &str) -> Vec<MergedRecord> {
        let mut slots: HashMap<BucketKey, usize> = HashMap::new();
        let mut records: Vec<MergedRecord> = Vec::new();

        for point in samples.iter().filter(|p| p.measurement == measurement) {
            if !point.value.is_finite() {
                continue;
            }
            let slot = *slots.entry(point.bucket()).or_insert_with(|| {
                records.push(MergedRecord::new(&point.time, self.label));
                records.len() - 1
            });
            let value = field_class(measurement, &point.field).apply(point.value);
            records[slot].set(point.field.clone(), value);
        }

        for record in &mut records {
            derive_fields(measurement, record);
        }

        debug!(measurement, buckets = records.len(), "aggregated series");
        records
    }

    /// Aggregates every family present in the batch
    ///
    /// `process_info` is skipped: its samples belong to many processes and are shaped by
    /// the process ranker instead.
    pub fn aggregate_all(&self, samples: &[MetricPoint]) -> SeriesSet {
        let mut families: Vec<&str> = Vec::new();
        for point in samples {
            let name = point.measurement.as_str();
            if name != constants::PROCESS_INFO && !families.contains(&name) {
                families.push(name);
            }
        }

        let series = families.into_iter().map(|name| (name.to_string(), self.aggregate(samples, name))).collect();
        SeriesSet { series }
    }
}

/// Fills family-specific derived fields once a bucket is fully merged
fn derive_fields(measurement: &str, record: &mut MergedRecord) {
    if measurement == constants::MEMORY_USAGE && !record.contains(constants::FREE_MB) {
        if let (Some(total), Some(used)) = (record.get(constants::TOTAL_MB), record.get(constants::USED_MB)) {
            record.set(constants::FREE_MB, round_to(total - used, 1));
        }
    }
}

/// Aggregated series for every family in one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SeriesSet {
    series: BTreeMap<String, Vec<MergedRecord>>,
}

impl SeriesSet {
    /// Records for `measurement`, empty when the family was absent
    pub fn get(&self, measurement: &str) -> &[MergedRecord] {
        self.series.get(measurement).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The most recent value of `field`, taken from the newest bucket that carries it
    ///
    /// Records keep first-seen order, so the newest bucket is looked up by key rather
    /// than by position.
    pub fn latest(&self, measurement: &str, field: &str) -> Option<f64> {
        self.get(measurement)
            .iter()
            .filter_map(|record| record.get(field).map(|value| (record.bucket, value)))
            .max_by_key(|(bucket, _)| *bucket)
            .map(|(_, value)| value)
    }

    /// Family names present in the set
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Whether no family produced a record
    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }
}
