//! Retrieval of the raw status page

use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, trace};

use crate::error::FetchError;

/// Source of page bodies for the monitor
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`, giving up after `timeout`
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Fetcher backed by a shared reqwest client
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    /// HTTP client (reused across requests for efficiency)
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        trace!("requesting {url}");

        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        trace!("received {} bytes", body.len());

        Ok(body)
    }
}
