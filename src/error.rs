//! Error types for vantage.

use thiserror::Error;

use crate::tune::TunedParams;

/// Errors that can occur while building, configuring, or querying an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Incompatible or malformed parameter combination.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Zero-size dataset at build time.
    #[error("dataset is empty")]
    EmptyDataset,

    /// A parameter key the receiving component does not recognize.
    ///
    /// Unknown keys are reported rather than silently ignored.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// The index does not support the requested query kind.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// The auto-tuner exhausted its budget without reaching the target recall.
    ///
    /// Carries the best configuration observed so callers can decide whether
    /// to proceed with it anyway.
    #[error("tuning failed to reach the desired recall (best configuration: {best})")]
    TuningFailed { best: TunedParams },

    /// I/O failure while reading a dataset or writing tuned parameters.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for vantage operations.
pub type Result<T> = std::result::Result<T, IndexError>;
