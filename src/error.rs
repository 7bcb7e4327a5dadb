//! Error type shared by the filters and buffers in this crate.

use std::time::Duration;

/// Errors reported when a structural invariant of a filter or buffer would be
/// violated.
///
/// Numeric conditions (NaN, infinity) are never reported here, they flow
/// through the arithmetic unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A sample had a different number of components than the filter was
    /// initialized with.
    #[error("expected a sample with {expected} components, got {actual}")]
    DimensionMismatch {
        /// The dimensionality fixed by the first sample.
        expected: usize,
        /// The dimensionality of the rejected sample.
        actual: usize,
    },
    /// A window size of zero was requested.
    #[error("window size must be at least 1")]
    InvalidWindowSize,
    /// A sample arrived with a timestamp earlier than the previous one.
    #[error("timestamp {current:?} is earlier than the previous timestamp {previous:?}")]
    TimestampRegression {
        /// Timestamp of the last accepted sample.
        previous: Duration,
        /// Timestamp of the rejected sample.
        current: Duration,
    },
}

/// Result type with [`FilterError`] as the error.
pub type Result<T, E = FilterError> = std::result::Result<T, E>;
