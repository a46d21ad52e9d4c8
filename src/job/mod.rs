//! Jobs and their terminal outcomes.
//!
//! - [`Job`] - immutable description of one resource to fetch
//! - [`JobId`] - submission-order identifier assigned by the pool
//! - [`Outcome`] - exactly one per job: completed, or failed with the last cause
//! - [`JobReport`] - outcome plus worker and timing, as returned by the pool
//! - [`JobError`] - construction errors, raised before a job is queued

mod error;
mod item;
mod outcome;

pub use error::JobError;
pub use item::{Job, JobId};
pub use outcome::{FailureCause, FailureKind, JobReport, Outcome};
