//! JSON job manifest.
//!
//! A manifest lists the jobs for one run plus optional run-wide defaults:
//!
//! ```json
//! {
//!   "workers": 4,
//!   "max_attempts": 3,
//!   "retry": { "strategy": "fixed", "delay_ms": 2000 },
//!   "jobs": [
//!     { "source": "https://example.com/a.bin", "destination": "a.bin",
//!       "sha256": "…", "max_attempts": 5 }
//!   ]
//! }
//! ```
//!
//! Unknown fields are rejected so that a typo never silently disables
//! verification.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::download::{ExponentialBackoff, FixedDelay, RetryPolicy};
use crate::job::{Job, JobError};

/// Errors raised while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or does not match the schema.
    #[error("invalid manifest {path}: {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A job entry was rejected.
    #[error("invalid job at index {index}: {source}")]
    InvalidJob {
        /// Position of the entry in `jobs`.
        index: usize,
        /// Why the entry was rejected.
        #[source]
        source: JobError,
    },

    /// Two entries write to the same file.
    #[error("job at index {index} writes to {path}, already used by job at index {first}")]
    DuplicateDestination {
        /// Position of the later entry.
        index: usize,
        /// Position of the entry that claimed the path first.
        first: usize,
        /// The shared resolved destination.
        path: PathBuf,
    },
}

/// Backoff strategy as written in a manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case", deny_unknown_fields)]
pub enum RetrySettings {
    /// Constant delay between attempts.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Exponential delay with jitter; omitted fields keep their defaults.
    Exponential {
        /// Delay after the first failure, in milliseconds.
        #[serde(default)]
        base_ms: Option<u64>,
        /// Cap applied before jitter, in milliseconds.
        #[serde(default)]
        max_ms: Option<u64>,
        /// Growth factor per attempt.
        #[serde(default)]
        multiplier: Option<f32>,
        /// Upper bound of random jitter, in milliseconds.
        #[serde(default)]
        jitter_ms: Option<u64>,
    },
}

impl RetrySettings {
    /// Builds the retry policy these settings describe.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        match self {
            Self::Fixed { delay_ms } => {
                RetryPolicy::new(FixedDelay::new(Duration::from_millis(*delay_ms)))
            }
            Self::Exponential {
                base_ms,
                max_ms,
                multiplier,
                jitter_ms,
            } => {
                let defaults = ExponentialBackoff::default();
                RetryPolicy::new(ExponentialBackoff::new(
                    base_ms.map_or(defaults.base_delay(), Duration::from_millis),
                    max_ms.map_or(defaults.max_delay(), Duration::from_millis),
                    multiplier.unwrap_or(defaults.multiplier()),
                    jitter_ms.map_or(defaults.max_jitter(), Duration::from_millis),
                ))
            }
        }
    }
}

/// One job as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobEntry {
    /// Remote locator.
    pub source: String,
    /// Destination path; relative paths resolve against the output directory.
    pub destination: PathBuf,
    /// Expected SHA-256 hex digest.
    #[serde(default)]
    pub sha256: Option<String>,
    /// Per-job attempt budget, overriding every run-wide value.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// A parsed job manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Worker count for the run.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Default attempt budget for jobs without their own.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Backoff strategy between attempts.
    #[serde(default)]
    pub retry: Option<RetrySettings>,
    /// Jobs in submission order.
    pub jobs: Vec<JobEntry>,
}

impl Manifest {
    /// Reads and parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read, or
    /// [`ManifestError::Parse`] if it is not a valid manifest.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses manifest text; `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] if `text` is not a valid manifest.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(text).map_err(|source| ManifestError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        debug!(
            path = %origin.display(),
            jobs = manifest.jobs.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// Builds validated jobs.
    ///
    /// Relative destinations are joined onto `output_dir`. A job's own
    /// `max_attempts` wins over `default_max_attempts`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidJob`] for the first entry that fails
    /// validation, or [`ManifestError::DuplicateDestination`] when two entries
    /// resolve to the same file; no jobs are returned in either case.
    pub fn to_jobs(
        &self,
        output_dir: &Path,
        default_max_attempts: u32,
    ) -> Result<Vec<Job>, ManifestError> {
        let mut claimed: HashMap<PathBuf, usize> = HashMap::with_capacity(self.jobs.len());
        let mut jobs = Vec::with_capacity(self.jobs.len());

        for (index, entry) in self.jobs.iter().enumerate() {
            let job = entry
                .to_job(output_dir, default_max_attempts)
                .map_err(|source| ManifestError::InvalidJob { index, source })?;

            // Concurrent jobs on one path would delete each other's files.
            if let Some(&first) = claimed.get(job.destination()) {
                return Err(ManifestError::DuplicateDestination {
                    index,
                    first,
                    path: job.destination().to_path_buf(),
                });
            }
            claimed.insert(job.destination().to_path_buf(), index);
            jobs.push(job);
        }

        Ok(jobs)
    }
}

impl JobEntry {
    fn to_job(&self, output_dir: &Path, default_max_attempts: u32) -> Result<Job, JobError> {
        let destination = if self.destination.is_absolute() {
            self.destination.clone()
        } else {
            output_dir.join(&self.destination)
        };
        let job = Job::new(
            self.source.clone(),
            destination,
            self.max_attempts.unwrap_or(default_max_attempts),
        )?;
        match &self.sha256 {
            Some(digest) => job.with_sha256(digest),
            None => Ok(job),
        }
    }
}
