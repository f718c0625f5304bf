use std::collections::HashSet;

use super::constants::*;
use super::*;
use crate::core::types::BucketLabel;
use crate::test_utils::{point, process_point};

#[test]
fn test_filters_to_requested_measurement() {
    let samples = vec![
        point(0, CPU_USAGE, "usage_pct", 12.34),
        point(0, MEMORY_USAGE, TOTAL_MB, 16000.0),
        point(1000, CPU_USAGE, "usage_pct", 15.06),
    ];

    let records = TimeSeriesAggregator::new().aggregate(&samples, CPU_USAGE);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("usage_pct"), Some(12.3));
    assert_eq!(records[1].get("usage_pct"), Some(15.1));
    assert!(records.iter().all(|r| !r.contains(TOTAL_MB)));
}

#[test]
fn test_merges_fields_within_same_second() {
    let samples = vec![
        point(10, DISK_IO, "read_mb_s", 1.234_5),
        point(480, DISK_IO, "write_mb_s", 0.5),
        point(990, DISK_IO, "read_iops", 120.06),
        point(1010, DISK_IO, "write_iops", 7.0),
    ];

    let records = TimeSeriesAggregator::new().aggregate(&samples, DISK_IO);
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.get("read_mb_s"), Some(1.23));
    assert_eq!(first.get("write_mb_s"), Some(0.5));
    assert_eq!(first.get("read_iops"), Some(120.1));
    assert!(!first.contains("write_iops"));

    assert_eq!(records[1].get("write_iops"), Some(7.0));
    assert_eq!(records[1].len(), 1);
}

#[test]
fn test_bucket_keys_are_unique() {
    let samples: Vec<_> = (0..50)
        .map(|i| point((i * 337) % 7000, SYSTEM_LOAD, if i % 2 == 0 { "load_1m" } else { "load_5m" }, i as f64))
        .collect();

    let records = TimeSeriesAggregator::new().aggregate(&samples, SYSTEM_LOAD);
    let keys: HashSet<_> = records.iter().map(|r| r.bucket).collect();
    assert_eq!(keys.len(), records.len());
    assert_eq!(records.len(), 7);
}

#[test]
fn test_first_seen_bucket_order_is_kept() {
    let samples = vec![
        point(3000, CPU_USAGE, "usage_pct", 3.0),
        point(1000, CPU_USAGE, "usage_pct", 1.0),
        point(3200, CPU_USAGE, "usage_pct", 4.0),
    ];

    let records = TimeSeriesAggregator::new().aggregate(&samples, CPU_USAGE);
    let values: Vec<_> = records.iter().filter_map(|r| r.get("usage_pct")).collect();
    assert_eq!(values, vec![4.0, 1.0]);
}

#[test]
fn test_duplicate_field_last_write_wins() {
    let samples = vec![point(0, CPU_USAGE, "usage_pct", 40.0), point(500, CPU_USAGE, "usage_pct", 60.0)];

    let records = TimeSeriesAggregator::new().aggregate(&samples, CPU_USAGE);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("usage_pct"), Some(60.0));
}

#[test]
fn test_free_mb_derived_from_total_and_used() {
    let samples = vec![point(0, MEMORY_USAGE, TOTAL_MB, 16000.0), point(0, MEMORY_USAGE, USED_MB, 6000.0)];

    let records = TimeSeriesAggregator::new().aggregate(&samples, MEMORY_USAGE);
    assert_eq!(records[0].get(FREE_MB), Some(10000.0));
}

#[test]
fn test_explicit_free_mb_survives() {
    let samples = vec![
        point(0, MEMORY_USAGE, TOTAL_MB, 16000.0),
        point(0, MEMORY_USAGE, USED_MB, 6000.0),
        point(0, MEMORY_USAGE, FREE_MB, 9000.0),
    ];

    let records = TimeSeriesAggregator::new().aggregate(&samples, MEMORY_USAGE);
    assert_eq!(records[0].get(FREE_MB), Some(9000.0));
}

#[test]
fn test_free_mb_needs_both_prerequisites() {
    let samples = vec![point(0, MEMORY_USAGE, USED_MB, 6000.0), point(1000, MEMORY_USAGE, TOTAL_MB, 16000.0)];

    let records = TimeSeriesAggregator::new().aggregate(&samples, MEMORY_USAGE);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| !r.contains(FREE_MB)));
}

#[test]
fn test_free_mb_rounded_to_one_decimal() {
    let samples = vec![point(0, MEMORY_USAGE, TOTAL_MB, 15999.96), point(0, MEMORY_USAGE, USED_MB, 6000.04)];

    let records = TimeSeriesAggregator::new().aggregate(&samples, MEMORY_USAGE);
    assert_eq!(records[0].get(TOTAL_MB), Some(16000.0));
    assert_eq!(records[0].get(USED_MB), Some(6000.0));
    assert_eq!(records[0].get(FREE_MB), Some(10000.0));
}

#[test]
fn test_counters_and_unknown_fields_pass_through() {
    let samples = vec![
        point(0, NETWORK_ACTIVITY, "packets_sent", 1234.0),
        point(0, NETWORK_ACTIVITY, "bytes_dropped", 0.123_456),
    ];

    let records = TimeSeriesAggregator::new().aggregate(&samples, NETWORK_ACTIVITY);
    assert_eq!(records[0].get("packets_sent"), Some(1234.0));
    assert_eq!(records[0].get("bytes_dropped"), Some(0.123_456));
}

#[test]
fn test_non_finite_values_are_skipped() {
    let samples = vec![point(0, CPU_USAGE, "usage_pct", f64::NAN), point(1000, CPU_USAGE, "usage_pct", 5.0)];

    let records = TimeSeriesAggregator::new().aggregate(&samples, CPU_USAGE);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("usage_pct"), Some(5.0));
}

#[test]
fn test_aggregate_is_idempotent() {
    let samples = vec![
        point(0, MEMORY_USAGE, TOTAL_MB, 16000.0),
        point(20, MEMORY_USAGE, USED_MB, 6000.0),
        point(1500, MEMORY_USAGE, USED_MB, 6100.0),
        point(1600, MEMORY_USAGE, TOTAL_MB, 16000.0),
    ];

    let aggregator = TimeSeriesAggregator::with_label(BucketLabel::Utc);
    let first = serde_json::to_string(&aggregator.aggregate(&samples, MEMORY_USAGE)).unwrap();
    let second = serde_json::to_string(&aggregator.aggregate(&samples, MEMORY_USAGE)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_input_yields_empty_series() {
    let records = TimeSeriesAggregator::new().aggregate(&[], CPU_USAGE);
    assert!(records.is_empty());
}

#[test]
fn test_aggregate_all_skips_process_samples() {
    let samples = vec![
        point(0, CPU_USAGE, "usage_pct", 20.0),
        process_point(0, 1, "init", CPU_PCT, 2.0),
        point(0, SYSTEM_UPTIME, UPTIME_S, 3600.0),
        point(1000, CPU_USAGE, "usage_pct", 30.0),
    ];

    let set = TimeSeriesAggregator::new().aggregate_all(&samples);
    let families: Vec<_> = set.families().collect();
    assert_eq!(families, vec![CPU_USAGE, SYSTEM_UPTIME]);
    assert!(set.get(PROCESS_INFO).is_empty());
    assert_eq!(set.latest(CPU_USAGE, "usage_pct"), Some(30.0));
    assert_eq!(set.latest(CPU_USAGE, "steal_pct"), None);
    assert!(!set.is_empty());
}

#[test]
fn test_latest_reads_newest_bucket_from_unsorted_input() {
    let samples = vec![
        point(2_000, CPU_USAGE, "usage_pct", 70.0),
        point(0, CPU_USAGE, "usage_pct", 10.0),
        point(1_000, CPU_USAGE, "usage_pct", 40.0),
        point(0, CPU_USAGE, "steal_pct", 1.0),
    ];

    let set = TimeSeriesAggregator::new().aggregate_all(&samples);
    assert_eq!(set.get(CPU_USAGE)[0].get("usage_pct"), Some(70.0));
    assert_eq!(set.latest(CPU_USAGE, "usage_pct"), Some(70.0));
    assert_eq!(set.latest(CPU_USAGE, "steal_pct"), Some(1.0));
}

#[test]
fn test_catalogue_lookup() {
    assert!(is_known_field(CPU_USAGE, "usage_pct"));
    assert!(is_known_field(MEMORY_USAGE, FREE_MB));
    assert!(!is_known_field(CPU_USAGE, "temp_c"));
    assert!(!is_known_field(CPU_INFO, "cores"));
    assert_eq!(field_class(DISK_IO, "read_mb_s").decimals(), Some(2));
    assert_eq!(field_class("gpu_usage", "busy_pct").decimals(), None);
}
