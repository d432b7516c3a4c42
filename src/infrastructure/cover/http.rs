//! HTTP cover art downloader

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::application::ports::{CoverError, CoverFetcher};

/// Cover download timeout
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads cover images over HTTP(S)
pub struct HttpCoverFetcher {
    client: Client,
}

impl HttpCoverFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

impl Default for HttpCoverFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoverFetcher for HttpCoverFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CoverError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoverError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoverError::HttpStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoverError::RequestFailed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CoverError::Empty);
        }

        debug!(url, size = bytes.len(), "cover downloaded");
        Ok(bytes.to_vec())
    }
}
