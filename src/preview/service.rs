//! Preview service: the request orchestrator.
//!
//! Ties together validation, fingerprinting, the preview cache and the
//! acquisition pipeline:
//!
//! 1. Validate the requested dimensions and the source locator
//! 2. Resolve the fingerprint of (locator, dimensions)
//! 3. Look the fingerprint up in the cache; return the artifact on a hit
//! 4. On a miss, acquire a fresh artifact and insert it into the cache
//!
//! Failed acquisitions never touch the cache.

use std::sync::Arc;

use http::HeaderMap;
use tracing::debug;
use url::Url;

use super::artifact::Artifact;
use super::cache::PreviewCache;
use super::fingerprint::{Dimensions, Fingerprint};
use super::pipeline::AcquisitionPipeline;
use crate::error::PreviewError;
use crate::fetch::SourceFetcher;

/// Default upper bound on requested width and height.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Scheme assumed when the source locator has none.
const DEFAULT_SCHEME: &str = "http";

// =============================================================================
// Request / Response
// =============================================================================

/// A request for a preview.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    /// Source locator as received, possibly without a scheme
    pub source: String,

    /// Requested width in pixels
    pub width: u32,

    /// Requested height in pixels
    pub height: u32,

    /// Headers to forward to the source server
    pub headers: HeaderMap,
}

impl PreviewRequest {
    /// Create a request without forwarded headers.
    pub fn new(source: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            source: source.into(),
            width,
            height,
            headers: HeaderMap::new(),
        }
    }

    /// Set the headers forwarded to the source server.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// A served preview.
#[derive(Debug, Clone)]
pub struct PreviewResponse {
    /// The preview image
    pub artifact: Artifact,

    /// Fingerprint the preview is cached under
    pub fingerprint: Fingerprint,

    /// Whether the preview came from the cache
    pub cache_hit: bool,
}

// =============================================================================
// Preview Service
// =============================================================================

/// Serves previews from the cache, acquiring them on a miss.
///
/// # Thread Safety
///
/// The service is `Send + Sync` and is meant to be shared across handlers
/// via `Arc`.
///
/// # Concurrent misses
///
/// Two concurrent requests for the same uncached fingerprint both run the
/// acquisition pipeline. The second insert finds the fingerprint present and
/// only refreshes its recency, so the cache stays consistent.
pub struct PreviewService<F: SourceFetcher> {
    cache: Arc<PreviewCache>,
    pipeline: AcquisitionPipeline<F>,
    max_dimension: u32,
}

impl<F: SourceFetcher + 'static> PreviewService<F> {
    /// Create a service with the default dimension bound.
    pub fn new(cache: Arc<PreviewCache>, pipeline: AcquisitionPipeline<F>) -> Self {
        Self {
            cache,
            pipeline,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Set the upper bound on requested width and height.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// The preview cache.
    pub fn cache(&self) -> &Arc<PreviewCache> {
        &self.cache
    }

    /// The acquisition pipeline.
    pub fn pipeline(&self) -> &AcquisitionPipeline<F> {
        &self.pipeline
    }

    /// Upper bound on requested width and height.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Serve a preview.
    ///
    /// # Errors
    ///
    /// - [`PreviewError::InvalidDimensions`] / [`PreviewError::InvalidSourceLocator`]
    ///   before any cache or network activity
    /// - any error of [`AcquisitionPipeline::acquire`], leaving the cache untouched
    /// - [`PreviewError::Storage`] if the cache cannot read or persist artifacts
    pub async fn get_preview(
        &self,
        request: PreviewRequest,
    ) -> Result<PreviewResponse, PreviewError> {
        let dimensions = self.validate_dimensions(request.width, request.height)?;
        let source = parse_source_locator(&request.source)?;
        let fingerprint = Fingerprint::resolve(source.as_str(), dimensions);

        if let Some(artifact) = self.cache.lookup(&fingerprint).await? {
            debug!(fingerprint = %fingerprint, source = %source, "Preview cache hit");
            return Ok(PreviewResponse {
                artifact,
                fingerprint,
                cache_hit: true,
            });
        }

        debug!(fingerprint = %fingerprint, source = %source, "Preview cache miss");

        let artifact = self
            .pipeline
            .acquire(&source, dimensions, &request.headers)
            .await?;

        let was_present = self.cache.insert(fingerprint.clone(), &artifact).await?;
        debug!(
            fingerprint = %fingerprint,
            bytes = artifact.len(),
            was_present,
            "Preview stored"
        );

        Ok(PreviewResponse {
            artifact,
            fingerprint,
            cache_hit: false,
        })
    }

    fn validate_dimensions(&self, width: u32, height: u32) -> Result<Dimensions, PreviewError> {
        let dimensions = Dimensions::new(width, height)?;

        if width > self.max_dimension || height > self.max_dimension {
            return Err(PreviewError::InvalidDimensions {
                width,
                height,
                reason: format!("dimensions should not exceed {}", self.max_dimension),
            });
        }

        Ok(dimensions)
    }
}

/// Normalize and validate a source locator.
///
/// A locator without a scheme is treated as `http://<locator>`. The result
/// must be an `http` or `https` URL with a host. The normalized URL is what
/// gets fetched and fingerprinted.
pub fn parse_source_locator(raw: &str) -> Result<Url, PreviewError> {
    let invalid = |reason: &str| PreviewError::InvalidSourceLocator {
        locator: raw.to_string(),
        reason: reason.to_string(),
    };

    let locator = raw.trim();
    if locator.is_empty() {
        return Err(invalid("url should not be empty"));
    }

    let lower = locator.to_ascii_lowercase();
    let candidate = if lower.starts_with("http:") || lower.starts_with("https:") {
        locator.to_string()
    } else if locator.contains("://") {
        return Err(invalid("only http and https sources are supported"));
    } else {
        format!("{}://{}", DEFAULT_SCHEME, locator)
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https sources are supported"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("url should have a host"));
    }

    Ok(url)
}

// =============================================================================
// Tests
// =============================================================================
