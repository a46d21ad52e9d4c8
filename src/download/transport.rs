//! Transport abstraction for streaming remote resources.
//!
//! The pool never talks to reqwest directly; it goes through
//! `Arc<dyn Transport>` so tests and alternative protocols can stand in for
//! HTTP.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use super::DownloadError;

/// Stream of body chunks. An `Err` item ends the attempt as a transport failure.
pub type BodyStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// An opened remote resource ready to be streamed.
pub struct Body {
    /// Size announced by the remote, if any.
    pub content_length: Option<u64>,
    /// Body chunks.
    pub stream: BodyStream,
}

impl Body {
    /// Wraps a stream with an optional announced length.
    #[must_use]
    pub fn new(content_length: Option<u64>, stream: BodyStream) -> Self {
        Self {
            content_length,
            stream,
        }
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Metadata learned without fetching the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// Size in bytes, when the remote reports one.
    pub size: Option<u64>,
}

/// Streaming fetch of a resource by locator.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Opens `source` for streaming read.
    ///
    /// # Errors
    ///
    /// Any failure to reach the resource or a non-success response.
    async fn open(&self, source: &str) -> Result<Body, DownloadError>;

    /// Fetches size metadata for `source` without the body.
    ///
    /// # Errors
    ///
    /// Same conditions as [`open`](Self::open).
    async fn head_metadata(&self, source: &str) -> Result<ResourceMetadata, DownloadError>;
}
