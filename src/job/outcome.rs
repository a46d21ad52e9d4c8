//! Terminal results of processing a job.

use std::fmt;
use std::time::Duration;

use super::{Job, JobId};

/// Classification of the last failure seen for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Remote unreachable, error status, or broken/truncated stream.
    Transport,
    /// Local file could not be created or written.
    Write,
    /// Content did not hash to the expected digest, or could not be read back.
    VerificationMismatch,
    /// The pool was cancelled before the job finished.
    Cancelled,
    /// The worker holding the job terminated without reporting.
    WorkerLost,
}

impl FailureKind {
    /// Returns a short, stable label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Write => "write",
            Self::VerificationMismatch => "verification_mismatch",
            Self::Cancelled => "cancelled",
            Self::WorkerLost => "worker_lost",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The last failure recorded for a job, kept as text so outcomes stay `Clone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCause {
    /// Failure class.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl FailureCause {
    /// Creates a cause of `kind` with `message`.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Cause recorded for jobs stopped by cancellation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "cancelled before completion")
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Terminal result for one job. Exactly one is produced per submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Content fetched and (when requested) verified.
    Completed {
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Gave up; the destination holds no unverified content.
    Failed {
        /// Last failure seen.
        cause: FailureCause,
        /// Attempts actually made (zero if cancelled before the first).
        attempts_made: u32,
    },
}

impl Outcome {
    /// Returns true for [`Outcome::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Attempts consumed, whichever way the job ended.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts } => *attempts,
            Self::Failed { attempts_made, .. } => *attempts_made,
        }
    }

    /// Failure cause, if the job failed.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureCause> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { cause, .. } => Some(cause),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { attempts } => write!(f, "completed after {attempts} attempt(s)"),
            Self::Failed {
                cause,
                attempts_made,
            } => write!(f, "failed after {attempts_made} attempt(s): {cause}"),
        }
    }
}

/// Outcome of one job together with where and how long it ran.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Id assigned at submission.
    pub id: JobId,
    /// The job as submitted.
    pub job: Job,
    /// Terminal result.
    pub outcome: Outcome,
    /// Worker that processed the job; `None` if no worker reported it.
    pub worker_id: Option<usize>,
    /// Wall time from dequeue to outcome.
    pub elapsed: Duration,
}
