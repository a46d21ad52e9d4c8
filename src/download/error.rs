//! Error types for the download module.
//!
//! Every variant carries the URL or path it failed on. The worker turns
//! these into [`AttemptResult`](super::AttemptResult) values; they never
//! escape a single attempt.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching, persisting or hashing a resource.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The body ended before the announced content length was reached.
    #[error("stream truncated downloading {url}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Truncated {
        /// The URL whose body was cut short.
        url: String,
        /// Content length announced by the remote.
        expected_bytes: u64,
        /// Bytes actually received.
        actual_bytes: u64,
    },

    /// Transport-side failure reported by a non-HTTP transport.
    #[error("stream error downloading {url}: {message}")]
    Stream {
        /// The locator being streamed.
        url: String,
        /// Transport-provided description.
        message: String,
    },

    /// File system error while creating, writing or flushing the destination.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination could not be read back for hashing.
    #[error("failed to read {path} for digest: {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The attempt was abandoned because the pool was cancelled.
    #[error("cancelled while downloading {url}")]
    Cancelled {
        /// The URL being downloaded.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a truncation error.
    pub fn truncated(url: impl Into<String>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Truncated {
            url: url.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a generic transport stream error.
    pub fn stream(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a write-side IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a read-side IO error for digest computation.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns true when the failure happened on the local filesystem.
    ///
    /// Local failures become `WriteFailure`; everything else is
    /// `TransportFailure`.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Read { .. })
    }
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: every variant needs a
// URL or path the source error does not carry.
