//! Run statistics and the report returned when a pool completes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::job::JobReport;

/// Counters updated by workers while the pool runs.
///
/// Uses atomic counters for thread-safe updates from concurrent worker
/// tasks.
#[derive(Debug, Default)]
pub struct PoolStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
    worker_panics: AtomicUsize,
}

impl PoolStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of jobs that completed.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of jobs that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the total number of jobs with an outcome (completed + failed).
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed() + self.failed()
    }

    /// Returns the number of retries scheduled across all jobs.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Returns the number of worker tasks that panicked.
    #[must_use]
    pub fn worker_panics(&self) -> usize {
        self.worker_panics.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_worker_panics(&self) {
        self.worker_panics.fetch_add(1, Ordering::SeqCst);
    }

    /// Copies the current counter values.
    pub(crate) fn snapshot(&self) -> Self {
        let copy = Self::new();
        copy.completed.store(self.completed(), Ordering::SeqCst);
        copy.failed.store(self.failed(), Ordering::SeqCst);
        copy.retried.store(self.retried(), Ordering::SeqCst);
        copy.worker_panics
            .store(self.worker_panics(), Ordering::SeqCst);
        copy
    }
}

/// Everything a finished pool produced.
#[derive(Debug)]
pub struct RunReport {
    /// One report per submitted job, ordered by job id.
    pub jobs: Vec<JobReport>,
    /// Aggregate counters.
    pub stats: PoolStats,
    /// Wall time from pool start to completion.
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of jobs that completed.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.jobs.iter().filter(|r| r.outcome.is_completed()).count()
    }

    /// Number of jobs that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.jobs.len() - self.completed_count()
    }

    /// Reports for failed jobs, in id order.
    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|r| !r.outcome.is_completed())
    }

    /// True when at least one job failed.
    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.failures().next().is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::job::{FailureCause, FailureKind, Job, JobId, Outcome};

    fn report(id: u64, outcome: Outcome) -> JobReport {
        JobReport {
            id: JobId(id),
            job: Job::new(format!("mem://{id}"), format!("{id}.bin"), 1).unwrap(),
            outcome,
            worker_id: Some(0),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();
        assert_eq!(stats.completed(), 0);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.retried(), 0);
        assert_eq!(stats.worker_panics(), 0);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_pool_stats_thread_safe() {
        use std::thread;

        let stats = Arc::new(PoolStats::new());
        let mut handles = Vec::new();

        for _ in 0..10 {
            let stats = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    stats.increment_completed();
                    stats.increment_failed();
                    stats.increment_retried();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // 10 threads * 100 increments each
        assert_eq!(stats.completed(), 1000);
        assert_eq!(stats.failed(), 1000);
        assert_eq!(stats.retried(), 1000);
        assert_eq!(stats.total(), 2000);
    }

    #[test]
    fn test_pool_stats_snapshot_copies_counters() {
        let stats = PoolStats::new();
        stats.increment_completed();
        stats.increment_worker_panics();
        let copy = stats.snapshot();
        stats.increment_completed();
        assert_eq!(copy.completed(), 1);
        assert_eq!(copy.worker_panics(), 1);
    }

    #[test]
    fn test_run_report_counts() {
        let run = RunReport {
            jobs: vec![
                report(1, Outcome::Completed { attempts: 1 }),
                report(
                    2,
                    Outcome::Failed {
                        cause: FailureCause::new(FailureKind::Transport, "HTTP 500"),
                        attempts_made: 2,
                    },
                ),
            ],
            stats: PoolStats::new(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(run.completed_count(), 1);
        assert_eq!(run.failed_count(), 1);
        assert!(run.any_failed());
        assert_eq!(run.failures().next().unwrap().id, JobId(2));
    }
}
