//! Error types for ring buffer construction.
//!
//! The core protocol has no recoverable error conditions once a ring
//! buffer exists: claim, commit, wait and release either complete or
//! (blocking variants) retry forever. The only conditions a caller can
//! actually fail to recover from are construction-time: a bad capacity,
//! a bad consumer count, or an allocation failure. Everything else is a
//! steady-state protocol state (back-pressure, not-yet-published, commit
//! queueing, a full registry) represented directly in the return type of
//! the operation that hits it, not as an error.

use thiserror::Error;

/// Result type alias for fallible ring buffer construction.
pub type Result<T> = std::result::Result<T, RingBufferError>;

/// Errors surfaced when constructing a [`crate::RingBuffer`].
#[derive(Error, Debug)]
pub enum RingBufferError {
    /// `CAPACITY` is not a power of two, or is smaller than 2.
    #[error("invalid capacity {capacity}: must be a power of two and >= 2")]
    MisconfiguredCapacity {
        /// The offending capacity.
        capacity: usize,
    },

    /// `MAX_CONSUMERS` is zero.
    #[error("invalid consumer registry size: MAX_CONSUMERS must be >= 1")]
    MisconfiguredConsumers,

    /// The backing slot array could not be allocated.
    #[error("failed to allocate {requested_bytes} bytes for ring buffer storage")]
    AllocationFailure {
        /// Number of bytes the failed allocation requested.
        requested_bytes: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misconfigured_capacity_reports_the_value() {
        let err = RingBufferError::MisconfiguredCapacity { capacity: 3 };
        assert_eq!(err.to_string(), "invalid capacity 3: must be a power of two and >= 2");
    }

    #[test]
    fn misconfigured_consumers_has_a_fixed_message() {
        let err = RingBufferError::MisconfiguredConsumers;
        assert!(err.to_string().contains("MAX_CONSUMERS"));
    }
}
