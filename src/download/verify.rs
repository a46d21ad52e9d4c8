//! SHA-256 content digests for downloaded files.
//!
//! A [`Digest`] is validated once, when a job is built, so the worker only
//! ever compares two well-formed lowercase hex strings. [`DigestVerifier`]
//! streams the file on disk through the hasher in fixed-size chunks.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest as _, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::DIGEST_BUFFER_SIZE;

/// Hex length of a SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

/// Optional algorithm prefix accepted by [`Digest::parse`].
const SHA256_PREFIX: &str = "sha256:";

/// Reasons a digest string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestParseError {
    /// Wrong number of hex characters.
    #[error("expected {SHA256_HEX_LEN} hex characters, got {0}")]
    Length(usize),

    /// Non-hex character present.
    #[error("digest contains non-hex characters")]
    NotHex,
}

/// A SHA-256 digest, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Parses a hex digest, optionally prefixed with `sha256:`.
    ///
    /// Parsing is case-insensitive; the stored form is lowercase so that
    /// equality is an exact, full-length comparison.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] when the value is not exactly 64 hex
    /// characters.
    pub fn parse(value: &str) -> Result<Self, DigestParseError> {
        let trimmed = value.trim();
        let hex_part = trimmed
            .get(..SHA256_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(SHA256_PREFIX))
            .map_or(trimmed, |_| &trimmed[SHA256_PREFIX.len()..]);

        if hex_part.len() != SHA256_HEX_LEN {
            return Err(DigestParseError::Length(hex_part.len()));
        }
        if !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DigestParseError::NotHex);
        }
        Ok(Self(hex_part.to_ascii_lowercase()))
    }

    /// Computes the digest of an in-memory buffer.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Returns the lowercase hex form.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Result of checking a file against an expected digest.
#[derive(Debug)]
pub enum Verification {
    /// File content hashes to the expected digest.
    Match,
    /// File content hashes to something else.
    Mismatch {
        /// Digest actually computed.
        actual: Digest,
    },
    /// File could not be read; treated like a mismatch by the worker.
    Unreadable(DownloadError),
}

/// Streams files through SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestVerifier;

impl DigestVerifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Computes the digest of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Read`] if the file cannot be opened or read.
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub async fn digest(&self, path: &Path) -> Result<Digest, DownloadError> {
        let mut file = File::open(path)
            .await
            .map_err(|e| DownloadError::read(path, e))?;

        let mut buffer = vec![0u8; DIGEST_BUFFER_SIZE];
        let mut hasher = Sha256::new();
        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| DownloadError::read(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Digest(hex::encode(hasher.finalize())))
    }

    /// Hashes the file at `path` and compares it with `expected`.
    pub async fn verify(&self, path: &Path, expected: &Digest) -> Verification {
        match self.digest(path).await {
            Ok(actual) if actual == *expected => Verification::Match,
            Ok(actual) => {
                debug!(expected = %expected, actual = %actual, "digest mismatch");
                Verification::Mismatch { actual }
            }
            Err(error) => Verification::Unreadable(error),
        }
    }
}
