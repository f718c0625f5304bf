/// Errors produced by the sample pipeline
///
/// Aggregation and ranking never fail on well-formed input; these variants cover the
/// feed boundary, configuration loading and rule validation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Sample feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown field: {measurement}.{field} is never emitted")]
    UnknownField { measurement: String, field: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Alert delivery failed: {0}")]
    Delivery(String),

    #[error("Poll task failed: {0}")]
    PollTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn feed_unavailable<S: Into<String>>(msg: S) -> Self {
        Error::FeedUnavailable(msg.into())
    }

    pub(crate) fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    pub(crate) fn unknown_field<M: Into<String>, F: Into<String>>(measurement: M, field: F) -> Self {
        Error::UnknownField { measurement: measurement.into(), field: field.into() }
    }

    pub(crate) fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Error::InvalidData(msg.into())
    }

    pub(crate) fn delivery<S: Into<String>>(msg: S) -> Self {
        Error::Delivery(msg.into())
    }

    pub(crate) fn poll_task<S: Into<String>>(msg: S) -> Self {
        Error::PollTask(msg.into())
    }

    /// Whether the poll loop may skip the current cycle and carry on
    ///
    /// Feed and payload problems are transient; configuration problems are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::FeedUnavailable(_) | Error::InvalidData(_) | Error::Json(_) | Error::Delivery(_))
    }
}

/// Result type for systempulse operations
pub type Result<T> = std::result::Result<T, Error>;
