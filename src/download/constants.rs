//! Constants for the download module (timeouts, buffer sizes, backoff defaults).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Read buffer used when hashing a file on disk (64 KiB).
pub const DIGEST_BUFFER_SIZE: usize = 64 * 1024;

/// Default wait between attempts for the fixed backoff strategy.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Default total attempts per job, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
