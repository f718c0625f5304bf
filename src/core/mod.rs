// Core modules
pub mod metrics;
pub mod types;

pub use metrics::{MergedRecord, MetricPoint};
pub use types::{BucketKey, BucketLabel, FieldClass, Percentage};
