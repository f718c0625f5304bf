use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::core::types::FieldClass;

/// Whole-host CPU utilisation
pub const CPU_USAGE: &str = "cpu_usage";
/// Static CPU description emitted by some collectors
pub const CPU_INFO: &str = "cpu_info";
/// Physical memory in MB
pub const MEMORY_USAGE: &str = "memory_usage";
/// Disk throughput and IOPS
pub const DISK_IO: &str = "disk_io";
/// Interface packet counters
pub const NETWORK_ACTIVITY: &str = "network_activity";
/// 1/5/15 minute load averages
pub const SYSTEM_LOAD: &str = "system_load";
/// Seconds since boot
pub const SYSTEM_UPTIME: &str = "system_uptime";
/// Per-process CPU and memory shares
pub const PROCESS_INFO: &str = "process_info";

/// Total memory field of `memory_usage`
pub const TOTAL_MB: &str = "total_mb";
/// Used memory field of `memory_usage`
pub const USED_MB: &str = "used_mb";
/// Free memory field of `memory_usage`, derived when the collector omits it
pub const FREE_MB: &str = "free_mb";
/// Uptime field of `system_uptime`
pub const UPTIME_S: &str = "uptime_s";
/// Raw per-process CPU share
pub const CPU_PCT: &str = "cpu_pct";
/// Per-process memory share
pub const MEM_PCT: &str = "mem_pct";

/// Families rendered as charts, in dashboard order
pub const CHART_FAMILIES: [&str; 6] = [CPU_USAGE, SYSTEM_LOAD, MEMORY_USAGE, DISK_IO, NETWORK_ACTIVITY, SYSTEM_UPTIME];

/// Every field the collector is known to emit, with its display precision
const CATALOG_ENTRIES: [(&str, &str, FieldClass); 17] = [
    (CPU_USAGE, "usage_pct", FieldClass::Percentage),
    (MEMORY_USAGE, TOTAL_MB, FieldClass::Megabytes),
    (MEMORY_USAGE, USED_MB, FieldClass::Megabytes),
    (MEMORY_USAGE, FREE_MB, FieldClass::Megabytes),
    (DISK_IO, "read_mb_s", FieldClass::Throughput),
    (DISK_IO, "write_mb_s", FieldClass::Throughput),
    (DISK_IO, "read_iops", FieldClass::Iops),
    (DISK_IO, "write_iops", FieldClass::Iops),
    (NETWORK_ACTIVITY, "packets_sent", FieldClass::Counter),
    (NETWORK_ACTIVITY, "packets_recv", FieldClass::Counter),
    (NETWORK_ACTIVITY, "err_out", FieldClass::Counter),
    (SYSTEM_LOAD, "load_1m", FieldClass::LoadAverage),
    (SYSTEM_LOAD, "load_5m", FieldClass::LoadAverage),
    (SYSTEM_LOAD, "load_15m", FieldClass::LoadAverage),
    (SYSTEM_UPTIME, UPTIME_S, FieldClass::Seconds),
    (PROCESS_INFO, CPU_PCT, FieldClass::Percentage),
    (PROCESS_INFO, MEM_PCT, FieldClass::Percentage),
];

/// Field catalogue indexed by measurement, then field
pub static FIELD_CATALOG: Lazy<HashMap<&'static str, HashMap<&'static str, FieldClass>>> = Lazy::new(|| {
    let mut catalog: HashMap<&'static str, HashMap<&'static str, FieldClass>> = HashMap::new();
    for (measurement, field, class) in CATALOG_ENTRIES {
        catalog.entry(measurement).or_default().insert(field, class);
    }
    catalog
});

/// Precision class for `measurement`/`field`, `Unclassified` when not catalogued
pub fn field_class(measurement: &str, field: &str) -> FieldClass {
    FIELD_CATALOG
        .get(measurement)
        .and_then(|fields| fields.get(field))
        .copied()
        .unwrap_or(FieldClass::Unclassified)
}

/// Whether the aggregator can ever emit `measurement`/`field`
pub fn is_known_field(measurement: &str, field: &str) -> bool {
    FIELD_CATALOG.get(measurement).is_some_and(|fields| fields.contains_key(field))
}
