//! The dispatcher: owns the job queue and the worker pool's lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::config::PoolConfig;
use super::events::EventSender;
use super::stats::{PoolStats, RunReport};
use super::worker::{QueuedJob, Worker, WorkerContext};
use super::PoolError;
use crate::download::{DigestVerifier, FetchExecutor, RetryPolicy, Transport};
use crate::job::{FailureCause, FailureKind, Job, JobId, JobReport, Outcome};

/// Bounded-concurrency fetch pool.
///
/// Exactly `worker_count` workers are spawned when the pool starts. Jobs
/// submitted with [`submit`](Self::submit) go through a bounded queue, so a
/// producer faster than the workers is held back once the queue is full.
/// [`await_completion`](Self::await_completion) closes input, waits for
/// every worker to exit and returns one report per submitted job.
///
/// # Concurrency Model
///
/// - Each worker runs in its own Tokio task and processes one job at a time
/// - The queue receiver is shared behind a mutex, so each job is handed to
///   exactly one worker
/// - A retry backoff suspends only the worker that is waiting
/// - A panicking worker is logged and counted; its siblings keep draining
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use fetchpool_core::download::{HttpClient, RetryPolicy};
/// use fetchpool_core::job::Job;
/// use fetchpool_core::pool::{FetchPool, PoolConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(HttpClient::new()?);
/// let mut pool = FetchPool::start(PoolConfig::new(4)?, transport, RetryPolicy::default());
/// pool.submit(Job::new("https://example.com/a.bin", "a.bin", 3)?).await?;
/// let report = pool.await_completion().await;
/// println!("completed: {}, failed: {}", report.completed_count(), report.failed_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FetchPool {
    sender: Option<mpsc::Sender<QueuedJob>>,
    handles: Vec<JoinHandle<()>>,
    reports: mpsc::UnboundedReceiver<JobReport>,
    submitted: BTreeMap<JobId, Job>,
    next_id: u64,
    stats: Arc<PoolStats>,
    cancel: CancellationToken,
    started: Instant,
}

impl FetchPool {
    /// Spawns the workers and returns a pool ready to accept jobs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: PoolConfig, transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self::start_with_events(config, transport, policy, None)
    }

    /// Like [`start`](Self::start), publishing progress on `events`.
    #[instrument(level = "debug", skip(transport, policy, events))]
    pub fn start_with_events(
        config: PoolConfig,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        events: Option<EventSender>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity());
        let (report_tx, reports) = mpsc::unbounded_channel();
        let stats = Arc::new(PoolStats::new());
        let cancel = CancellationToken::new();

        debug!(
            workers = config.worker_count(),
            queue_capacity = config.queue_capacity(),
            probe_metadata = config.probe_metadata(),
            backoff = ?policy.backoff(),
            "starting fetch pool"
        );

        let ctx = WorkerContext {
            queue: Arc::new(Mutex::new(receiver)),
            executor: FetchExecutor::new(transport),
            verifier: DigestVerifier::new(),
            policy,
            probe_metadata: config.probe_metadata(),
            cancel: cancel.clone(),
            stats: Arc::clone(&stats),
            events,
            reports: report_tx,
        };

        let handles = (0..config.worker_count())
            .map(|worker_id| tokio::spawn(Worker::new(worker_id, ctx.clone()).run()))
            .collect();

        Self {
            sender: Some(sender),
            handles,
            reports,
            submitted: BTreeMap::new(),
            next_id: 1,
            stats,
            cancel,
            started: Instant::now(),
        }
    }

    /// Number of workers spawned.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Token that cancels the whole run when triggered.
    ///
    /// Jobs in flight stop at the next suspension point and remove their
    /// partial file; jobs still queued are reported as cancelled without an
    /// attempt.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live counters.
    #[must_use]
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Enqueues a job, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InputClosed`] after [`close_input`](Self::close_input),
    /// or [`PoolError::WorkersUnavailable`] if every worker has exited.
    pub async fn submit(&mut self, job: Job) -> Result<JobId, PoolError> {
        let sender = self.sender.as_ref().ok_or(PoolError::InputClosed)?;
        let id = JobId(self.next_id);

        sender
            .send((id, job.clone()))
            .await
            .map_err(|_| PoolError::WorkersUnavailable)?;

        debug!(job_id = %id, source = %job.source(), "job queued");
        self.next_id += 1;
        self.submitted.insert(id, job);
        Ok(id)
    }

    /// Signals that no more jobs will be submitted. Safe to call more than once.
    pub fn close_input(&mut self) {
        if self.sender.take().is_some() {
            debug!(submitted = self.submitted.len(), "pool input closed");
        }
    }

    /// Closes input, waits for every worker to exit and collects the outcomes.
    ///
    /// Individual job failures never make this fail; every submitted job
    /// appears exactly once in the returned report.
    #[instrument(skip(self), fields(submitted = self.submitted.len()))]
    pub async fn await_completion(mut self) -> RunReport {
        self.close_input();

        debug!(workers = self.handles.len(), "waiting for workers to drain");
        for handle in std::mem::take(&mut self.handles) {
            // Task panics are logged and counted but don't fail the run
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task panicked");
                self.stats.increment_worker_panics();
            }
        }

        let mut jobs = Vec::with_capacity(self.submitted.len());
        while let Ok(report) = self.reports.try_recv() {
            self.submitted.remove(&report.id);
            jobs.push(report);
        }

        // Jobs held by a worker that died never produced an outcome.
        for (id, job) in std::mem::take(&mut self.submitted) {
            warn!(job_id = %id, source = %job.source(), "no outcome reported for job");
            self.stats.increment_failed();
            jobs.push(JobReport {
                id,
                job,
                outcome: Outcome::Failed {
                    cause: FailureCause::new(
                        FailureKind::WorkerLost,
                        "worker terminated before reporting",
                    ),
                    attempts_made: 0,
                },
                worker_id: None,
                elapsed: Duration::ZERO,
            });
        }
        jobs.sort_by_key(|report| report.id);

        let stats = self.stats.snapshot();
        info!(
            completed = stats.completed(),
            failed = stats.failed(),
            retried = stats.retried(),
            total = stats.total(),
            "pool run complete"
        );

        RunReport {
            jobs,
            stats,
            elapsed: self.started.elapsed(),
        }
    }

    /// Submits every job in order, then awaits completion.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] if a job cannot be submitted.
    pub async fn run(mut self, jobs: impl IntoIterator<Item = Job>) -> Result<RunReport, PoolError> {
        for job in jobs {
            self.submit(job).await?;
        }
        Ok(self.await_completion().await)
    }
}
