//! Progress events published while the pool runs.
//!
//! Events are advisory: a dropped receiver never affects job processing,
//! and the set of outcomes in the run report is the only contractual output.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::job::{FailureKind, JobId, Outcome};

/// Sending half handed to the pool.
pub type EventSender = mpsc::UnboundedSender<PoolEvent>;

/// Receiving half consumed by a progress display.
pub type EventReceiver = mpsc::UnboundedReceiver<PoolEvent>;

/// Creates an event channel.
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Something observable happened to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// A worker dequeued the job.
    JobStarted {
        /// Job id.
        id: JobId,
        /// Worker processing the job.
        worker_id: usize,
        /// Remote locator of the job.
        source: String,
        /// Size from the metadata probe, when enabled and answered.
        size_hint: Option<u64>,
    },
    /// An attempt is about to open the source.
    AttemptStarted {
        /// Job id.
        id: JobId,
        /// 1-based attempt number.
        attempt: u32,
        /// The job's attempt budget.
        max_attempts: u32,
    },
    /// Bytes have reached the destination file during the current attempt.
    BytesWritten {
        /// Job id.
        id: JobId,
        /// Bytes written so far in this attempt.
        written: u64,
        /// Length announced by the remote, if any.
        total: Option<u64>,
    },
    /// An attempt failed.
    AttemptFailed {
        /// Job id.
        id: JobId,
        /// The attempt that failed.
        attempt: u32,
        /// Failure classification.
        kind: FailureKind,
        /// Human-readable cause.
        message: String,
        /// Backoff before the next attempt; `None` when no attempt follows.
        retry_in: Option<Duration>,
    },
    /// Terminal outcome reached.
    JobFinished {
        /// Job id.
        id: JobId,
        /// The job's single outcome.
        outcome: Outcome,
    },
}

impl PoolEvent {
    /// Job the event refers to.
    #[must_use]
    pub fn job_id(&self) -> JobId {
        match self {
            Self::JobStarted { id, .. }
            | Self::AttemptStarted { id, .. }
            | Self::BytesWritten { id, .. }
            | Self::AttemptFailed { id, .. }
            | Self::JobFinished { id, .. } => *id,
        }
    }
}
