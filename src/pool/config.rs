//! Pool sizing and behavior configuration.

use super::PoolError;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 100;

/// Default worker count if not specified.
pub const DEFAULT_WORKERS: usize = 4;

/// Validated configuration for a [`FetchPool`](super::FetchPool).
///
/// # Example
///
/// ```
/// use fetchpool_core::pool::PoolConfig;
///
/// let config = PoolConfig::new(8)?.with_queue_capacity(32)?;
/// assert_eq!(config.worker_count(), 8);
/// assert_eq!(config.queue_capacity(), 32);
/// # Ok::<(), fetchpool_core::pool::PoolError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    worker_count: usize,
    queue_capacity: Option<usize>,
    probe_metadata: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKERS,
            queue_capacity: None,
            probe_metadata: false,
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with `worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkerCount`] if the value is outside
    /// the valid range (1-100).
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&worker_count) {
            return Err(PoolError::InvalidWorkerCount {
                value: worker_count,
            });
        }
        Ok(Self {
            worker_count,
            ..Self::default()
        })
    }

    /// Bounds the job queue at `capacity` buffered jobs.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidQueueCapacity`] if `capacity` is zero.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidQueueCapacity);
        }
        self.queue_capacity = Some(capacity);
        Ok(self)
    }

    /// Issues a metadata request before each job to learn its size.
    #[must_use]
    pub fn with_probe_metadata(mut self, probe: bool) -> Self {
        self.probe_metadata = probe;
        self
    }

    /// Number of workers spawned at start.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Queue bound; twice the worker count unless set explicitly.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.worker_count * 2)
    }

    /// Whether workers probe metadata before fetching.
    #[must_use]
    pub fn probe_metadata(&self) -> bool {
        self.probe_metadata
    }
}
