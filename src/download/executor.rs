//! A single fetch attempt: open the remote stream, copy it to disk, report.
//!
//! Both handles (remote body and local file) live inside one attempt and are
//! dropped before [`FetchExecutor::fetch`] returns, on every path. A failing
//! attempt also removes whatever it managed to write, so a partial file is
//! never left where a verified one would be.

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::DownloadError;
use super::transport::{Body, Transport};

/// Outcome of the fetch phase of one attempt, consumed immediately by the
/// worker. A successful fetch is then checked by
/// [`DigestVerifier`](super::DigestVerifier), whose
/// [`Verification`](super::Verification) completes the attempt.
#[derive(Debug)]
pub enum AttemptResult {
    /// The remote could not be reached or the stream broke.
    TransportFailure(DownloadError),
    /// The destination could not be created or written.
    WriteFailure(DownloadError),
    /// The pool was cancelled while the attempt was in flight.
    Cancelled,
    /// The full body was written and flushed.
    Success {
        /// Bytes written to the destination.
        bytes: u64,
    },
}

impl AttemptResult {
    fn from_error(error: DownloadError) -> Self {
        match error {
            DownloadError::Cancelled { .. } => Self::Cancelled,
            e if e.is_local() => Self::WriteFailure(e),
            e => Self::TransportFailure(e),
        }
    }
}

/// Performs fetch attempts through a shared [`Transport`].
#[derive(Debug, Clone)]
pub struct FetchExecutor {
    transport: Arc<dyn Transport>,
}

impl FetchExecutor {
    /// Creates an executor over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns the transport this executor fetches through.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Streams `source` into `destination`, creating or truncating it.
    ///
    /// `on_progress` is called with the running byte count and the announced
    /// length after every chunk that reaches the file. Success is only reported after the full body
    /// has been written and flushed.
    #[instrument(level = "debug", skip(self, cancel, on_progress), fields(destination = %destination.display()))]
    pub async fn fetch<F>(
        &self,
        source: &str,
        destination: &Path,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> AttemptResult
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return AttemptResult::Cancelled,
            opened = self.transport.open(source) => match opened {
                Ok(body) => body,
                Err(error) => return AttemptResult::from_error(error),
            },
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty())
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return AttemptResult::WriteFailure(DownloadError::io(parent, e));
        }

        let file = match File::create(destination).await {
            Ok(file) => file,
            Err(e) => return AttemptResult::WriteFailure(DownloadError::io(destination, e)),
        };

        let copied = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DownloadError::cancelled(source)),
            copied = copy_body(body, file, source, destination, on_progress) => copied,
        };

        match copied {
            Ok(bytes) => {
                debug!(bytes, "body written");
                AttemptResult::Success { bytes }
            }
            Err(error) => {
                remove_partial(destination).await;
                AttemptResult::from_error(error)
            }
        }
    }
}

/// Copies the body into `file`, returning bytes written.
///
/// Takes ownership of both handles so they are closed when this returns or
/// when the future is dropped by a cancelled `select!`.
async fn copy_body<F>(
    body: Body,
    file: File,
    url: &str,
    path: &Path,
    mut on_progress: F,
) -> Result<u64, DownloadError>
where
    F: FnMut(u64, Option<u64>) + Send,
{
    let Body {
        content_length,
        mut stream,
    } = body;
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        bytes_written += chunk.len() as u64;
        on_progress(bytes_written, content_length);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(path, e))?;

    if let Some(expected) = content_length
        && expected != bytes_written
    {
        return Err(DownloadError::truncated(url, expected, bytes_written));
    }

    Ok(bytes_written)
}

/// Deletes `path`, logging rather than failing when it cannot.
pub(crate) async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove file"),
    }
}
