//! SystemPulse - shapes raw system metric samples for display and alerting
//!
//! A collector periodically exports flat `(time, measurement, field, value, tags)`
//! samples. This crate turns each batch into the three things a monitoring dashboard
//! needs:
//!
//! - **Chart series**: per-family records merged by second, rounded to display precision,
//!   with derived fields such as free memory
//! - **Process table**: the top processes by CPU, normalized to the host's core count
//! - **Alerts**: threshold rules with a per-rule cooldown that suppresses notification
//!   storms during a sustained breach
//!
//! A [`poll::PollCycle`] drives the pipeline on a fixed interval and keeps the last good
//! output visible when the collector is unreachable.
//!
//! # Examples
//!
//! ```rust
//! use systempulse::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let payload = r#"{"data": [
//!     {"time": "2023-11-14T22:13:20Z", "measurement": "cpu_usage", "field": "usage_pct", "value": 93.57},
//!     {"time": "2023-11-14T22:13:20Z", "measurement": "process_info", "field": "cpu_pct",
//!      "value": 600.0, "pid": 42, "name": "postgres"}
//! ]}"#;
//!
//! let mut cycle = PollCycle::new(Config::new(12), StaticFeed::new(payload))?;
//! let output = cycle.run_once(chrono::Utc::now()).await?.expect("first fetch succeeds");
//!
//! assert_eq!(output.series.latest("cpu_usage", "usage_pct"), Some(93.6));
//! assert_eq!(output.processes[0].cpu_pct, 50.0);
//! assert_eq!(output.alerts[0].message, "High CPU Usage: 93.6%");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Aggregation and ranking never fail. Errors come from the edges:
//!
//! ```rust
//! use systempulse::{config::Config, Error};
//!
//! let err = Config::from_json_str(r#"{"core_count": 0}"#).unwrap_err();
//! assert!(matches!(err, Error::InvalidConfiguration(_)));
//! assert!(!err.is_recoverable());
//! ```
//!
//! # Thread Safety
//!
//! Alert state is the only state carried across cycles. It sits behind a read-write
//! lock so observability readers never see an evaluation in progress.

pub mod aggregate;
pub mod alert;
pub mod config;
pub mod core;
pub mod error;
pub mod feed;
pub mod poll;
pub mod process;
pub mod store;
pub mod system;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::aggregate::{SeriesSet, TimeSeriesAggregator};
    pub use crate::alert::{AlertEngine, AlertEvent, AlertRule, AlertSink, AlertState, Comparator, LogSink};
    pub use crate::config::Config;
    pub use crate::core::metrics::{MergedRecord, MetricPoint};
    pub use crate::core::types::{BucketKey, BucketLabel};
    pub use crate::feed::{FeedBatch, FileFeed, SampleFeed, StaticFeed};
    pub use crate::poll::{CycleOutput, PollCycle, PollHandle};
    pub use crate::process::{ProcessRanker, ProcessSample};
    pub use crate::store::SampleStore;
    pub use crate::system::SystemUptime;
    pub use crate::Error;
    pub use crate::Result;
}
