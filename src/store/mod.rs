//! Holder for the most recent sample batch
//!
//! A `SampleStore` is built once per poll cycle from whatever the feed returned and is
//! replaced wholesale on the next cycle. It carries no logic beyond lookups.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::core::metrics::MetricPoint;
use crate::feed::FeedBatch;

/// The raw samples of one cycle
#[derive(Debug, Clone)]
pub struct SampleStore {
    points: Vec<MetricPoint>,
    dropped: usize,
    fetched_at: DateTime<Utc>,
}

impl SampleStore {
    /// Creates a store from already-parsed samples
    pub fn new(points: Vec<MetricPoint>, dropped: usize, fetched_at: DateTime<Utc>) -> Self {
        Self { points, dropped, fetched_at }
    }

    /// Takes ownership of a fetched batch
    pub fn from_batch(batch: FeedBatch, fetched_at: DateTime<Utc>) -> Self {
        Self::new(batch.points, batch.dropped, fetched_at)
    }

    /// All samples in feed order
    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    /// Samples of a single measurement family
    pub fn measurement<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricPoint> + 'a {
        self.points.iter().filter(move |p| p.measurement == name)
    }

    /// Distinct `(measurement, field)` pairs present in the batch
    pub fn observed_fields(&self) -> BTreeSet<(String, String)> {
        self.points.iter().map(|p| (p.measurement.clone(), p.field.clone())).collect()
    }

    /// Malformed records discarded while parsing the batch
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// When the batch was fetched
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
