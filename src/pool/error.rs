//! Error types for pool operations.

use thiserror::Error;

use super::config::{MAX_WORKERS, MIN_WORKERS};

/// Errors raised by the pool itself.
///
/// Individual job failures are never reported here; they end up as
/// [`Outcome::Failed`](crate::job::Outcome::Failed) in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Worker count outside the supported range.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The rejected value.
        value: usize,
    },

    /// Queue capacity of zero.
    #[error("invalid queue capacity 0: must be at least 1")]
    InvalidQueueCapacity,

    /// `submit` was called after `close_input`.
    #[error("cannot submit job: pool input is already closed")]
    InputClosed,

    /// Every worker has exited, so nothing can take the job.
    #[error("cannot submit job: no workers are running")]
    WorkersUnavailable,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_worker_count_display() {
        let msg = PoolError::InvalidWorkerCount { value: 0 }.to_string();
        assert!(msg.contains("invalid worker count"));
        assert!(msg.contains('0'));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_pool_error_input_closed_display() {
        assert!(PoolError::InputClosed.to_string().contains("closed"));
    }
}
