use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::source::{FetchResponse, SourceFetcher};
use crate::error::FetchError;

/// Default transport timeout for a single source fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed implementation of [`SourceFetcher`].
///
/// The underlying client pools connections, so one fetcher should be created
/// at startup and shared.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("image-previewer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<FetchResponse, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let response = self
            .client
            .get(url.as_str())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Source responded");

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchResponse { status, body })
    }
}
