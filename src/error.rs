//! Error types for trace normalization and event detection.

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, OtdrError>;

/// Errors that can occur while building or analysing traces.
///
/// An empty trace set is deliberately absent: analysing zero traces
/// produces an empty event table.
#[derive(Error, Debug)]
pub enum OtdrError {
    /// Trace is shorter than its smoothing window
    #[error("trace has {samples} samples but the smoothing window needs {window_len}")]
    InsufficientSamples { samples: usize, window_len: usize },

    /// Offset-alignment reference sample does not exist after rescaling
    #[error("reference index {index} is out of range for a trace of {len} samples")]
    ReferenceIndexOutOfRange { index: usize, len: usize },

    /// A raw "distance<TAB>level" record could not be parsed
    #[error("malformed record on line {line} ({record:?}): {reason}")]
    MalformedRecord {
        line: usize,
        record: String,
        reason: String,
    },

    /// Level and distance rows differ in length
    #[error("trace has {levels} levels but {distances} distances")]
    LengthMismatch { levels: usize, distances: usize },

    /// Distance row decreases at the given sample
    #[error("distance decreases at sample {index}")]
    UnorderedDistances { index: usize },

    /// NaN or infinite value in a trace
    #[error("non-finite value at sample {index}")]
    NonFiniteSample { index: usize },

    /// Metadata field missing or unusable
    #[error("invalid trace metadata: {0}")]
    InvalidMetadata(String),

    /// Project file could not be (de)serialized
    #[error("project file: {0}")]
    Project(#[from] serde_json::Error),
}
