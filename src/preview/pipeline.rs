//! Acquisition pipeline.
//!
//! Produces a brand new artifact for a cache miss: fetch the source over
//! HTTP, then render it on the blocking pool with [`PreviewEncoder`].

use std::sync::Arc;

use http::HeaderMap;
use tracing::debug;
use url::Url;

use super::artifact::Artifact;
use super::encoder::PreviewEncoder;
use super::fingerprint::Dimensions;
use crate::error::PreviewError;
use crate::fetch::SourceFetcher;

/// Fetches a source image and renders it into a preview.
///
/// # Thread Safety
///
/// The pipeline is `Send + Sync` and keeps no per-request state; one
/// instance serves all requests.
pub struct AcquisitionPipeline<F: SourceFetcher> {
    fetcher: Arc<F>,
    encoder: PreviewEncoder,
}

impl<F: SourceFetcher + 'static> AcquisitionPipeline<F> {
    /// Create a pipeline with the default encoder settings.
    pub fn new(fetcher: F) -> Self {
        Self::with_shared_fetcher(Arc::new(fetcher))
    }

    /// Create a pipeline around a fetcher that is shared with other owners.
    pub fn with_shared_fetcher(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            encoder: PreviewEncoder::new(),
        }
    }

    /// Replace the encoder settings.
    pub fn with_encoder(mut self, encoder: PreviewEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// The encoder used to render previews.
    pub fn encoder(&self) -> &PreviewEncoder {
        &self.encoder
    }

    /// The source fetcher.
    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Produce a `dimensions`-sized preview of the image at `source`.
    ///
    /// `headers` are forwarded to the source server as-is.
    ///
    /// # Errors
    ///
    /// - [`PreviewError::SourceUnavailable`] if the source cannot be reached
    ///   or answers with a non-success status
    /// - any error of [`PreviewEncoder::render`]
    pub async fn acquire(
        &self,
        source: &Url,
        dimensions: Dimensions,
        headers: &HeaderMap,
    ) -> Result<Artifact, PreviewError> {
        let response = self.fetcher.get(source, headers).await.map_err(|e| {
            PreviewError::SourceUnavailable {
                locator: source.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !response.status.is_success() {
            return Err(PreviewError::SourceUnavailable {
                locator: source.to_string(),
                reason: format!("source responded with status {}", response.status),
            });
        }

        debug!(
            source = %source,
            bytes = response.body.len(),
            dimensions = %dimensions,
            "Rendering preview"
        );

        let encoder = self.encoder.clone();
        let body = response.body;

        tokio::task::spawn_blocking(move || encoder.render(&body, dimensions))
            .await
            .map_err(|e| PreviewError::Processing {
                message: format!("preview rendering task failed: {}", e),
            })?
    }
}

// =============================================================================
// Tests
// =============================================================================
