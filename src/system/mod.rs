//! Host uptime display
//!
//! ```rust
//! use systempulse::system::SystemUptime;
//!
//! assert_eq!(SystemUptime::from_secs(93_784.0).to_string(), "26h 3m 4s");
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::aggregate::constants::{SYSTEM_UPTIME, UPTIME_S};
use crate::store::SampleStore;

/// Time since boot, rendered as hours, minutes and seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemUptime(Duration);

impl SystemUptime {
    /// Uptime from a seconds reading
    ///
    /// Negative and non-finite readings become zero; readings beyond `Duration::MAX`
    /// saturate.
    pub fn from_secs(secs: f64) -> Self {
        let secs = if secs.is_finite() && secs > 0.0 { secs } else { 0.0 };
        Self(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    /// The last `system_uptime.uptime_s` sample of the batch
    pub fn from_store(store: &SampleStore) -> Option<Self> {
        store.measurement(SYSTEM_UPTIME).filter(|p| p.field == UPTIME_S).last().map(|p| Self::from_secs(p.value))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl fmt::Display for SystemUptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.as_secs();
        write!(f, "{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
    }
}
