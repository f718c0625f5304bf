//! Top-N process ranking
//!
//! Per-process samples arrive either already joined ([`ProcessSample`]) or as raw
//! `process_info` points split across `cpu_pct` and `mem_pct`. The ranker joins them by
//! pid, normalizes CPU to the host's logical core count, sorts by CPU and keeps the top
//! entries.
//!
//! Raw per-process CPU accounting counts each busy core as 100%, so a process saturating
//! six of twelve cores reports 600%. Dividing by the core count puts every process on a
//! 0-100 scale of total host capacity.
//!
//! # Examples
//!
//! ```rust
//! use systempulse::process::{ProcessRanker, ProcessSample};
//!
//! let samples = vec![
//!     ProcessSample::new(10, "postgres", 600.0, 4.0),
//!     ProcessSample::new(11, "ffmpeg", 1500.0, 2.5),
//! ];
//!
//! let ranked = ProcessRanker::new(12, 10).unwrap().rank(&samples);
//! assert_eq!(ranked[0].name, "ffmpeg");
//! assert_eq!(ranked[0].cpu_pct, 100.0);
//! assert_eq!(ranked[1].cpu_pct, 50.0);
//! ```


use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::constants::{CPU_PCT, MEM_PCT, PROCESS_INFO};
use crate::core::metrics::{MetricPoint, TAG_NAME};
use crate::core::types::{round_to, Percentage};
use crate::error::{Error, Result};

/// Default number of rows in the process table
pub const DEFAULT_TOP_N: usize = 10;

/// CPU and memory share of one process in the current cycle
///
/// There is no identity across cycles: a pid seen again next cycle is a fresh sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    /// Process ID, unique within one cycle
    pub pid: u32,
    /// Process name
    pub name: String,
    /// CPU share; raw before ranking, normalized to 0-100 after
    pub cpu_pct: f64,
    /// Memory share in percent
    pub mem_pct: f64,
}

impl ProcessSample {
    /// Create a new ProcessSample instance
    pub fn new(pid: u32, name: impl Into<String>, cpu_pct: f64, mem_pct: f64) -> Self {
        Self { pid, name: name.into(), cpu_pct, mem_pct }
    }
}

/// Either input shape the ranker accepts
#[derive(Debug, Clone, Copy)]
pub enum ProcessInput<'a> {
    /// Raw `process_info` points to be joined by pid
    Points(&'a [MetricPoint]),
    /// Samples that are already joined
    Samples(&'a [ProcessSample]),
}

impl<'a> From<&'a [MetricPoint]> for ProcessInput<'a> {
    fn from(points: &'a [MetricPoint]) -> Self {
        Self::Points(points)
    }
}

impl<'a> From<&'a Vec<MetricPoint>> for ProcessInput<'a> {
    fn from(points: &'a Vec<MetricPoint>) -> Self {
        Self::Points(points.as_slice())
    }
}

impl<'a> From<&'a [ProcessSample]> for ProcessInput<'a> {
    fn from(samples: &'a [ProcessSample]) -> Self {
        Self::Samples(samples)
    }
}

impl<'a> From<&'a Vec<ProcessSample>> for ProcessInput<'a> {
    fn from(samples: &'a Vec<ProcessSample>) -> Self {
        Self::Samples(samples.as_slice())
    }
}

/// Joins, normalizes, sorts and truncates per-process samples
#[derive(Debug, Clone, Copy)]
pub struct ProcessRanker {
    core_count: usize,
    limit: usize,
}

impl ProcessRanker {
    /// Creates a ranker for a host with `core_count` logical cores
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when either argument is zero.
    pub fn new(core_count: usize, limit: usize) -> Result<Self> {
        if core_count == 0 {
            return Err(Error::invalid_configuration("core_count must be a positive integer"));
        }
        if limit == 0 {
            return Err(Error::invalid_configuration("limit must be a positive integer"));
        }
        Ok(Self { core_count, limit })
    }

    pub fn core_count(&self) -> usize {
        self.core_count
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Ranks the cycle's processes by normalized CPU, highest first
    ///
    /// Equal CPU values keep their input (join) order. Returns an empty table when the
    /// input holds no process data.
    pub fn rank<'a>(&self, input: impl Into<ProcessInput<'a>>) -> Vec<ProcessSample> {
        let mut table = match input.into() {
            ProcessInput::Points(points) => join_points(points),
            ProcessInput::Samples(samples) => samples.to_vec(),
        };

        for sample in &mut table {
            sample.cpu_pct = self.normalize_cpu(sample.cpu_pct);
            sample.mem_pct = if sample.mem_pct.is_finite() { round_to(sample.mem_pct, 1) } else { 0.0 };
        }

        // `sort_by` is stable, which keeps join order among equal CPU values.
        table.sort_by(|a, b| b.cpu_pct.total_cmp(&a.cpu_pct));
        table.truncate(self.limit);

        debug!(rows = table.len(), core_count = self.core_count, "ranked processes");
        table
    }

    /// `min(raw / core_count, 100)`, rounded to one decimal; non-finite readings count as 0
    pub fn normalize_cpu(&self, raw_cpu_pct: f64) -> f64 {
        if !raw_cpu_pct.is_finite() {
            return 0.0;
        }
        round_to(Percentage::from_f64(raw_cpu_pct / self.core_count as f64).as_f64(), 1)
    }
}

/// One-shot ranking without keeping a [`ProcessRanker`] around
///
/// # Errors
///
/// Returns [`Error::InvalidConfiguration`] when `core_count` or `limit` is zero.
pub fn rank<'a>(input: impl Into<ProcessInput<'a>>, core_count: usize, limit: usize) -> Result<Vec<ProcessSample>> {
    Ok(ProcessRanker::new(core_count, limit)?.rank(input))
}

/// Joins `process_info` points into one sample per pid, in first-seen order
///
/// A pid with only a CPU or only a memory sample gets 0 for the missing side. Repeated
/// samples of the same field for one pid keep the highest value. Points whose `pid` tag
/// is missing or not numeric are skipped.
pub fn join_points(points: &[MetricPoint]) -> Vec<ProcessSample> {
    let mut slots: HashMap<u32, usize> = HashMap::new();
    let mut joined: Vec<ProcessSample> = Vec::new();

    for point in points.iter().filter(|p| p.measurement == PROCESS_INFO) {
        let is_cpu = point.field == CPU_PCT;
        if !is_cpu && point.field != MEM_PCT {
            continue;
        }
        let Some(pid) = point.pid() else {
            continue;
        };

        let slot = *slots.entry(pid).or_insert_with(|| {
            joined.push(ProcessSample::new(pid, String::new(), 0.0, 0.0));
            joined.len() - 1
        });
        let sample = &mut joined[slot];

        if sample.name.is_empty() {
            if let Some(name) = point.tag(TAG_NAME) {
                sample.name = name.to_string();
            }
        }

        let target = if is_cpu { &mut sample.cpu_pct } else { &mut sample.mem_pct };
        if point.value > *target {
            *target = point.value;
        }
    }

    joined
}
