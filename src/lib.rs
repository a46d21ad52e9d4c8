//! Fetchpool Core Library
//!
//! A bounded-concurrency fetch pipeline: a fixed pool of workers pulls jobs
//! from a shared queue, streams each remote resource to disk, verifies it
//! against an expected SHA-256 digest and retries under a pluggable backoff
//! policy. Every submitted job ends in exactly one [`Outcome`].
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - transport, single-attempt executor, digests, retry policy
//! - [`job`] - job descriptions and terminal outcomes
//! - [`pool`] - dispatcher, workers, progress events, run report
//! - [`manifest`] - JSON job manifests

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod job;
pub mod manifest;
pub mod pool;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use download::{
    Backoff, Digest, DownloadError, ExponentialBackoff, FixedDelay, HttpClient, RetryPolicy,
    Transport,
};
pub use job::{FailureCause, FailureKind, Job, JobError, JobId, JobReport, Outcome};
pub use manifest::{Manifest, ManifestError};
pub use pool::{FetchPool, PoolConfig, PoolError, PoolEvent, PoolStats, RunReport};
