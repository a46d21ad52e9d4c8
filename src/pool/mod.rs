//! Bounded worker pool driving jobs to their outcomes.
//!
//! # Overview
//!
//! - [`FetchPool`] - the dispatcher: queue, workers, completion barrier
//! - [`PoolConfig`] - worker count, queue bound, metadata probing
//! - [`PoolEvent`] - advisory progress events for a display
//! - [`RunReport`] / [`PoolStats`] - what a finished run produced
//! - [`PoolError`] - configuration and submission errors
//!
//! The lifecycle is construction, submission, [`FetchPool::await_completion`],
//! disposal. The pool holds nothing but its queue, its worker handles and
//! the counters they update.

mod config;
mod dispatcher;
mod error;
mod events;
mod stats;
mod worker;

pub use config::{DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS, PoolConfig};
pub use dispatcher::FetchPool;
pub use error::PoolError;
pub use events::{EventReceiver, EventSender, PoolEvent, event_channel};
pub use stats::{PoolStats, RunReport};
