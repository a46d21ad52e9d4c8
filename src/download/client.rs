//! HTTP transport built on reqwest.
//!
//! This module provides the `HttpClient` struct which opens streaming GET
//! requests with proper timeout configuration and error mapping.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::transport::{Body, ResourceMetadata, Transport};
use crate::user_agent;

/// HTTP client for streaming downloads.
///
/// This client is designed to be created once and shared by every worker in
/// a pool, taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use fetchpool_core::download::{HttpClient, Transport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let body = client.open("https://example.com/file.bin").await?;
/// println!("announced size: {:?}", body.content_length);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Network`] if the underlying client cannot be built.
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Network`] if the underlying client cannot be built.
    #[instrument(level = "debug")]
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|e| DownloadError::network("<client builder>", e))?;
        Ok(Self { client })
    }

    async fn send_request(&self, method: reqwest::Method, url: &str) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(skip(self), fields(url = %source))]
    async fn open(&self, source: &str) -> Result<Body, DownloadError> {
        let response = self.send_request(reqwest::Method::GET, source).await?;
        let content_length = response.content_length();
        debug!(?content_length, "response headers received");

        let url = source.to_string();
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_reqwest_error(&url, e)))
            .boxed();
        Ok(Body::new(content_length, stream))
    }

    #[instrument(skip(self), fields(url = %source))]
    async fn head_metadata(&self, source: &str) -> Result<ResourceMetadata, DownloadError> {
        let response = self.send_request(reqwest::Method::HEAD, source).await?;
        let size = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        Ok(ResourceMetadata { size })
    }
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    async fn collect(body: Body) -> Result<Vec<u8>, DownloadError> {
        let mut stream = body.stream;
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_open_streams_body() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"binary content"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let body = client
            .open(&format!("{}/file.bin", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body.content_length, Some(14));
        assert_eq!(collect(body).await.unwrap(), b"binary content");
    }

    #[tokio::test]
    async fn test_open_maps_error_status() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let result = client.open(&format!("{}/missing", mock_server.uri())).await;
        match result {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_open_invalid_url() {
        let client = HttpClient::new().unwrap();
        let result = client.open("not-a-valid-url").await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_head_metadata_reads_content_length() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("HEAD"))
            .and(path("/sized"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let metadata = client
            .head_metadata(&format!("{}/sized", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(metadata.size, Some(2048));
    }
}
