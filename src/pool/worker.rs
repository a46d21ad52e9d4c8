//! Worker loop and the per-job retry/verify state machine.
//!
//! A worker takes one job at a time off the shared queue and drives it
//! through `Attempting -> Verifying -> (Retrying -> Attempting)* ->
//! Completed | Exhausted`. Per-attempt failures stay inside this module;
//! only the terminal [`Outcome`] leaves it.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::events::{EventSender, PoolEvent};
use super::stats::PoolStats;
use crate::download::{
    AttemptResult, DigestVerifier, FetchExecutor, RetryDecision, RetryPolicy, Verification,
    remove_partial,
};
use crate::job::{FailureCause, FailureKind, Job, JobId, JobReport, Outcome};

/// Queue entry: a job and the id assigned at submission.
pub(crate) type QueuedJob = (JobId, Job);

/// Receiving end of the job queue, shared by every worker.
///
/// The mutex makes dequeue a single hand-off: each job is received by
/// exactly one worker.
pub(crate) type SharedQueue = Arc<Mutex<mpsc::Receiver<QueuedJob>>>;

/// Where a job currently is in its lifecycle.
#[derive(Debug)]
enum JobState {
    Attempting { attempt: u32 },
    Verifying { attempt: u32 },
    Retrying { attempt: u32, cause: FailureCause },
    Completed { attempts: u32 },
    Exhausted { attempts: u32, cause: FailureCause },
}

/// Everything a worker shares with its siblings.
#[derive(Debug, Clone)]
pub(crate) struct WorkerContext {
    pub queue: SharedQueue,
    pub executor: FetchExecutor,
    pub verifier: DigestVerifier,
    pub policy: RetryPolicy,
    pub probe_metadata: bool,
    pub cancel: CancellationToken,
    pub stats: Arc<PoolStats>,
    pub events: Option<EventSender>,
    pub reports: mpsc::UnboundedSender<JobReport>,
}

/// One concurrent execution unit of the pool.
#[derive(Debug)]
pub(crate) struct Worker {
    id: usize,
    ctx: WorkerContext,
}

impl Worker {
    pub(crate) fn new(id: usize, ctx: WorkerContext) -> Self {
        Self { id, ctx }
    }

    /// Drains the queue until it is closed and empty.
    #[instrument(level = "debug", skip(self), fields(worker_id = self.id))]
    pub(crate) async fn run(self) {
        debug!("worker started");
        let mut processed = 0usize;

        while let Some((id, job)) = self.dequeue().await {
            let started = Instant::now();
            let outcome = self.process(id, &job).await;

            if outcome.is_completed() {
                self.ctx.stats.increment_completed();
            } else {
                self.ctx.stats.increment_failed();
            }
            self.emit(PoolEvent::JobFinished {
                id,
                outcome: outcome.clone(),
            });

            let report = JobReport {
                id,
                job,
                outcome,
                worker_id: Some(self.id),
                elapsed: started.elapsed(),
            };
            if self.ctx.reports.send(report).is_err() {
                warn!(job_id = %id, "report receiver dropped");
            }
            processed += 1;
        }

        debug!(processed, "worker exiting: queue closed");
    }

    async fn dequeue(&self) -> Option<QueuedJob> {
        let mut queue = self.ctx.queue.lock().await;
        queue.recv().await
    }

    /// Runs one job to its terminal outcome.
    #[instrument(level = "debug", skip(self, job), fields(worker_id = self.id, job_id = %id, source = %job.source()))]
    async fn process(&self, id: JobId, job: &Job) -> Outcome {
        let size_hint = self.probe_size(job).await;
        self.emit(PoolEvent::JobStarted {
            id,
            worker_id: self.id,
            source: job.source().to_string(),
            size_hint,
        });

        let mut state = JobState::Attempting { attempt: 1 };
        loop {
            state = match state {
                JobState::Attempting { attempt } => {
                    if self.ctx.cancel.is_cancelled() {
                        debug!(attempt, "cancelled before attempt");
                        return cancelled(attempt - 1);
                    }
                    self.attempt(id, job, attempt).await
                }
                JobState::Verifying { attempt } => self.verify(job, attempt).await,
                JobState::Retrying { attempt, cause } => {
                    match self.ctx.policy.decide(attempt, job.max_attempts()) {
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(attempt, %reason, "not retrying");
                            self.emit_attempt_failed(id, attempt, &cause, None);
                            JobState::Exhausted {
                                attempts: attempt,
                                cause,
                            }
                        }
                        RetryDecision::Retry {
                            delay,
                            attempt: next_attempt,
                        } => {
                            info!(
                                source = %job.source(),
                                attempt = next_attempt,
                                max_attempts = job.max_attempts(),
                                delay_ms = delay.as_millis(),
                                error = %cause,
                                "retrying download"
                            );
                            self.emit_attempt_failed(id, attempt, &cause, Some(delay));
                            self.ctx.stats.increment_retried();

                            tokio::select! {
                                biased;
                                () = self.ctx.cancel.cancelled() => return cancelled(attempt),
                                () = tokio::time::sleep(delay) => {}
                            }
                            JobState::Attempting {
                                attempt: next_attempt,
                            }
                        }
                    }
                }
                JobState::Completed { attempts } => {
                    info!(destination = %job.destination().display(), attempts, "download completed");
                    return Outcome::Completed { attempts };
                }
                JobState::Exhausted { attempts, cause } => {
                    warn!(
                        source = %job.source(),
                        error = %cause,
                        attempts,
                        "download failed"
                    );
                    return Outcome::Failed {
                        cause,
                        attempts_made: attempts,
                    };
                }
            };
        }
    }

    async fn attempt(&self, id: JobId, job: &Job, attempt: u32) -> JobState {
        debug!(attempt, "attempting download");
        self.emit(PoolEvent::AttemptStarted {
            id,
            attempt,
            max_attempts: job.max_attempts(),
        });

        let events = self.ctx.events.clone();
        let result = self
            .ctx
            .executor
            .fetch(
                job.source(),
                job.destination(),
                &self.ctx.cancel,
                move |written, total| {
                    if let Some(events) = &events {
                        let _ = events.send(PoolEvent::BytesWritten { id, written, total });
                    }
                },
            )
            .await;

        match result {
            AttemptResult::Success { bytes } => {
                debug!(attempt, bytes, "transport succeeded");
                JobState::Verifying { attempt }
            }
            AttemptResult::Cancelled => JobState::Exhausted {
                attempts: attempt,
                cause: FailureCause::cancelled(),
            },
            AttemptResult::TransportFailure(e) => JobState::Retrying {
                attempt,
                cause: FailureCause::new(FailureKind::Transport, e.to_string()),
            },
            AttemptResult::WriteFailure(e) => JobState::Retrying {
                attempt,
                cause: FailureCause::new(FailureKind::Write, e.to_string()),
            },
        }
    }

    async fn verify(&self, job: &Job, attempt: u32) -> JobState {
        let Some(expected) = job.expected_digest() else {
            return JobState::Completed { attempts: attempt };
        };

        let detail = match self.ctx.verifier.verify(job.destination(), expected).await {
            Verification::Match => {
                debug!(attempt, digest = %expected, "digest verified");
                return JobState::Completed { attempts: attempt };
            }
            Verification::Mismatch { actual } => format!("got {actual}"),
            // Counts against the budget like a mismatch.
            Verification::Unreadable(error) => error.to_string(),
        };

        warn!(
            destination = %job.destination().display(),
            attempt,
            %detail,
            "digest mismatch, discarding file"
        );
        remove_partial(job.destination()).await;

        JobState::Retrying {
            attempt,
            cause: FailureCause::new(
                FailureKind::VerificationMismatch,
                format!("expected {expected}, {detail}"),
            ),
        }
    }

    /// Looks up the size of the job's source when probing is enabled.
    async fn probe_size(&self, job: &Job) -> Option<u64> {
        if !self.ctx.probe_metadata || self.ctx.cancel.is_cancelled() {
            return None;
        }
        let transport = self.ctx.executor.transport();
        let probed = tokio::select! {
            biased;
            () = self.ctx.cancel.cancelled() => return None,
            probed = transport.head_metadata(job.source()) => probed,
        };
        match probed {
            Ok(metadata) => metadata.size,
            Err(e) => {
                debug!(error = %e, "metadata probe failed");
                None
            }
        }
    }

    fn emit(&self, event: PoolEvent) {
        if let Some(events) = &self.ctx.events {
            // A closed receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }

    fn emit_attempt_failed(
        &self,
        id: JobId,
        attempt: u32,
        cause: &FailureCause,
        retry_in: Option<std::time::Duration>,
    ) {
        self.emit(PoolEvent::AttemptFailed {
            id,
            attempt,
            kind: cause.kind,
            message: cause.message.clone(),
            retry_in,
        });
    }
}

fn cancelled(attempts_made: u32) -> Outcome {
    Outcome::Failed {
        cause: FailureCause::cancelled(),
        attempts_made,
    }
}
