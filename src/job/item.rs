//! The unit of work handed to the pool.

use std::fmt;
use std::path::{Path, PathBuf};

use super::JobError;
use crate::download::Digest;

/// Identifier assigned to a job when it is submitted to a pool.
///
/// Ids are allocated in submission order, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One resource to fetch, persist and optionally verify.
///
/// A `Job` is validated on construction and never mutated afterwards; the
/// pool takes it by value on submission.
///
/// # Example
///
/// ```
/// use fetchpool_core::job::Job;
///
/// let job = Job::new("https://example.com/a.bin", "a.bin", 3)?
///     .with_sha256("dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f")?;
/// assert_eq!(job.max_attempts(), 3);
/// assert!(job.expected_digest().is_some());
/// # Ok::<(), fetchpool_core::job::JobError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    source: String,
    destination: PathBuf,
    expected_digest: Option<Digest>,
    max_attempts: u32,
}

impl Job {
    /// Creates a job without an expected digest.
    ///
    /// # Errors
    ///
    /// Returns [`JobError`] if `source` or `destination` is empty, or if
    /// `max_attempts` is zero.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<PathBuf>,
        max_attempts: u32,
    ) -> Result<Self, JobError> {
        let source = source.into();
        let destination = destination.into();

        if source.trim().is_empty() {
            return Err(JobError::EmptySource);
        }
        if destination.as_os_str().is_empty() {
            return Err(JobError::EmptyDestination {
                source_locator: source,
            });
        }
        if max_attempts == 0 {
            return Err(JobError::ZeroAttempts {
                source_locator: source,
            });
        }

        Ok(Self {
            source,
            destination,
            expected_digest: None,
            max_attempts,
        })
    }

    /// Sets the digest the downloaded content must match.
    #[must_use]
    pub fn with_expected_digest(mut self, digest: Digest) -> Self {
        self.expected_digest = Some(digest);
        self
    }

    /// Parses `value` as SHA-256 hex and sets it as the expected digest.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidDigest`] if `value` is not a valid digest.
    pub fn with_sha256(self, value: &str) -> Result<Self, JobError> {
        let digest = Digest::parse(value).map_err(|reason| JobError::InvalidDigest {
            value: value.to_string(),
            reason,
        })?;
        Ok(self.with_expected_digest(digest))
    }

    /// Remote locator.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Local path the content is written to.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Expected content digest, if verification is requested.
    #[must_use]
    pub fn expected_digest(&self) -> Option<&Digest> {
        self.expected_digest.as_ref()
    }

    /// Total attempts permitted, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::DigestParseError;

    const DIGEST: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    #[test]
    fn test_job_new_valid() {
        let job = Job::new("https://example.com/a", "out/a.bin", 3).unwrap();
        assert_eq!(job.source(), "https://example.com/a");
        assert_eq!(job.destination(), Path::new("out/a.bin"));
        assert_eq!(job.max_attempts(), 3);
        assert!(job.expected_digest().is_none());
    }

    #[test]
    fn test_job_new_rejects_zero_attempts() {
        let result = Job::new("https://example.com/a", "a.bin", 0);
        assert!(matches!(result, Err(JobError::ZeroAttempts { .. })));
    }

    #[test]
    fn test_job_new_rejects_empty_source() {
        assert_eq!(Job::new("   ", "a.bin", 1), Err(JobError::EmptySource));
    }

    #[test]
    fn test_job_new_rejects_empty_destination() {
        let result = Job::new("https://example.com/a", "", 1);
        assert!(matches!(result, Err(JobError::EmptyDestination { .. })));
    }

    #[test]
    fn test_job_with_sha256_normalizes() {
        let job = Job::new("https://example.com/a", "a.bin", 1)
            .unwrap()
            .with_sha256(&DIGEST.to_ascii_uppercase())
            .unwrap();
        assert_eq!(job.expected_digest().unwrap().as_hex(), DIGEST);
    }

    #[test]
    fn test_job_with_sha256_rejects_short_digest() {
        let result = Job::new("https://example.com/a", "a.bin", 1)
            .unwrap()
            .with_sha256("deadbeef");
        assert_eq!(
            result,
            Err(JobError::InvalidDigest {
                value: "deadbeef".to_string(),
                reason: DigestParseError::Length(8),
            })
        );
    }

    #[test]
    fn test_job_id_display() {
        assert_eq!(JobId(7).to_string(), "#7");
    }
}
