//! In-memory [`Transport`] whose responses are scripted per source.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::task::Poll;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;

use crate::download::{Body, DownloadError, ResourceMetadata, Transport};

/// What one `open` call for a source returns.
#[derive(Debug, Clone)]
pub enum Step {
    /// Full body with a matching announced length.
    Body(Vec<u8>),
    /// `open` itself fails.
    Refuse,
    /// Body yields `data`, then the stream errors.
    BrokenBody(Vec<u8>),
    /// Body announces `announced` bytes but delivers only `data`.
    ShortBody {
        /// Announced content length.
        announced: u64,
        /// Bytes actually delivered.
        data: Vec<u8>,
    },
    /// Body yields `data`, then never ends.
    Hang(Vec<u8>),
    /// Body yields `data`, and `path` is deleted as the stream ends, so the
    /// writer finishes into an unlinked file and nothing is left to read back.
    Vanish {
        /// Bytes delivered.
        data: Vec<u8>,
        /// File deleted at end of stream.
        path: PathBuf,
    },
    /// `open` panics.
    Panic,
}

impl Step {
    pub fn body(data: &[u8]) -> Self {
        Self::Body(data.to_vec())
    }
}

/// Scripted fake transport.
///
/// Each `open` of a source consumes the next scripted step; the last step
/// repeats once the script runs out. Unscripted sources are refused.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    opens: Mutex<HashMap<String, u32>>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn script(self, source: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(source.to_string(), steps.into());
        self
    }

    /// Holds every `open` for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `open` calls made for `source`.
    pub fn opens(&self, source: &str) -> u32 {
        self.opens
            .lock()
            .unwrap()
            .get(source)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of `open` calls observed in flight at once.
    pub fn max_concurrent_opens(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn next_step(&self, source: &str) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        let steps = scripts.get_mut(source)?;
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }

    fn peek_step(&self, source: &str) -> Option<Step> {
        self.scripts
            .lock()
            .unwrap()
            .get(source)
            .and_then(|steps| steps.front().cloned())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, source: &str) -> Result<Body, DownloadError> {
        *self
            .opens
            .lock()
            .unwrap()
            .entry(source.to_string())
            .or_default() += 1;

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let step = self.next_step(source).unwrap_or(Step::Refuse);
        let url = source.to_string();
        let body = match step {
            Step::Body(data) => Body::new(
                Some(data.len() as u64),
                stream::iter([Ok::<_, DownloadError>(Bytes::from(data))]).boxed(),
            ),
            Step::Refuse => return Err(DownloadError::stream(url, "connection refused")),
            Step::BrokenBody(data) => Body::new(
                None,
                stream::iter([
                    Ok(Bytes::from(data)),
                    Err(DownloadError::stream(url, "connection reset")),
                ])
                .boxed(),
            ),
            Step::ShortBody { announced, data } => Body::new(
                Some(announced),
                stream::iter([Ok::<_, DownloadError>(Bytes::from(data))]).boxed(),
            ),
            Step::Vanish { data, path } => Body::new(
                Some(data.len() as u64),
                stream::iter([Ok::<_, DownloadError>(Bytes::from(data))])
                    .chain(stream::poll_fn(move |_| {
                        let _ = std::fs::remove_file(&path);
                        Poll::Ready(None)
                    }))
                    .boxed(),
            ),
            Step::Panic => panic!("scripted transport panic for {source}"),
            Step::Hang(data) => Body::new(
                None,
                stream::iter([Ok::<_, DownloadError>(Bytes::from(data))])
                    .chain(stream::pending())
                    .boxed(),
            ),
        };
        Ok(body)
    }

    async fn head_metadata(&self, source: &str) -> Result<ResourceMetadata, DownloadError> {
        match self.peek_step(source) {
            Some(Step::Body(data)) => Ok(ResourceMetadata {
                size: Some(data.len() as u64),
            }),
            Some(Step::ShortBody { announced, .. }) => Ok(ResourceMetadata {
                size: Some(announced),
            }),
            Some(_) => Ok(ResourceMetadata::default()),
            None => Err(DownloadError::stream(source, "connection refused")),
        }
    }
}
