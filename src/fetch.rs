//! Document Fetching
//!
//! The outbound collaborator the cache uses to pull a document by URL.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::MAX_DOCUMENT_SIZE;
use crate::error::PreloadError;

/// Raw result of fetching a document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl FetchedDocument {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// == Fetcher Trait ==
/// Fetches the bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, PreloadError>;
}

// == HTTP Fetcher ==
/// [`Fetcher`] issuing HTTP GET requests with a per-request timeout.
///
/// Bodies larger than `max_bytes` are rejected with
/// [`PreloadError::TooLarge`] without being buffered in full.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Creates a fetcher accepting documents up to [`MAX_DOCUMENT_SIZE`].
    pub fn new(timeout: Duration) -> Result<Self, PreloadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_bytes: MAX_DOCUMENT_SIZE,
        })
    }

    /// Lowers or raises the accepted document size.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn too_large(&self, url: &str) -> PreloadError {
        PreloadError::TooLarge {
            key: url.to_string(),
            limit: self.max_bytes,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, PreloadError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(self.too_large(url));
        }

        // the declared length may be absent or wrong
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, status, size = body.len(), "fetched document");

        Ok(FetchedDocument { status, body })
    }
}
