//! Error types for job construction.

use thiserror::Error;

use crate::download::DigestParseError;

/// Reasons a [`Job`](super::Job) is rejected before it reaches the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// `max_attempts` counts total attempts, so zero would never fetch.
    #[error("max_attempts must be at least 1 (got 0) for {source_locator}")]
    ZeroAttempts {
        /// Source of the rejected job.
        source_locator: String,
    },

    /// Source locator is empty.
    #[error("job source must not be empty")]
    EmptySource,

    /// Destination path is empty.
    #[error("job destination must not be empty for {source_locator}")]
    EmptyDestination {
        /// Source of the rejected job.
        source_locator: String,
    },

    /// Expected digest is not a SHA-256 hex string.
    #[error(
        "invalid sha256 digest '{value}': {reason}\n  Suggestion: Provide 64 hex characters, optionally prefixed with 'sha256:'"
    )]
    InvalidDigest {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: DigestParseError,
    },
}
