//! Fetching, persisting and verifying a single resource.
//!
//! This module holds everything one attempt needs and nothing about
//! scheduling: the [`Transport`] seam and its reqwest-backed [`HttpClient`],
//! the [`FetchExecutor`] that streams a body to disk, the [`DigestVerifier`]
//! that hashes it back, and the [`RetryPolicy`] deciding whether another
//! attempt follows.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use fetchpool_core::download::{AttemptResult, FetchExecutor, HttpClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = FetchExecutor::new(Arc::new(HttpClient::new()?));
//! let cancel = CancellationToken::new();
//! match executor
//!     .fetch("https://example.com/file.bin", Path::new("file.bin"), &cancel, |_, _| {})
//!     .await
//! {
//!     AttemptResult::Success { bytes } => println!("wrote {bytes} bytes"),
//!     other => println!("attempt failed: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod executor;
mod retry;
mod transport;
mod verify;

pub use client::HttpClient;
pub use constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use error::DownloadError;
pub use executor::{AttemptResult, FetchExecutor};
pub(crate) use executor::remove_partial;
pub use retry::{Backoff, ExponentialBackoff, FixedDelay, RetryDecision, RetryPolicy};
pub use transport::{Body, BodyStream, ResourceMetadata, Transport};
pub use verify::{Digest, DigestParseError, DigestVerifier, Verification};

// Note: no module-local Result alias; signatures spell out
// `Result<T, DownloadError>`.
