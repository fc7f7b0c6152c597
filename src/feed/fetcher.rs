use crate::error::ErrorKind;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving a feed document.
///
/// All of them surface as [`ErrorKind::NetworkError`]; the variants exist
/// for the operational log.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Body is not valid UTF-8
    #[error("Response is not valid UTF-8")]
    InvalidEncoding,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::NetworkError
    }
}

/// The HTTP client could not be constructed (e.g. an invalid User-Agent).
#[derive(Debug, Error)]
#[error("Failed to build HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

/// Retrieves the raw text of a feed.
#[async_trait]
pub trait FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`FeedFetcher`] backed by `reqwest`.
///
/// One attempt per call: a failed fetch is retried by the next polling
/// cycle, not here.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_FEED_SIZE,
        }
    }

    /// Builds a client that identifies itself with `user_agent`.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, ClientBuildError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::new(client))
    }

    /// Upper bound for one whole fetch: connect, headers and body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        tracing::trace!(url = %url, bytes = bytes.len(), "Fetched feed");

        String::from_utf8(bytes).map_err(|_| FetchError::InvalidEncoding)
    }
}

impl HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_bytes).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
