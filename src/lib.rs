//! # Image Previewer
//!
//! An HTTP service that serves exact-size JPEG previews of remote images.
//!
//! A request names a source image URL and a target width and height. The
//! service fetches the source, fill-resizes it (scale to cover, then crop the
//! center) and returns a JPEG. Results are kept in a bounded on-disk cache
//! with least-recently-used eviction, so repeated requests are served
//! without touching the source.
//!
//! ## Features
//!
//! - **Fill-resize**: exact output size with center cropping, Lanczos resampling
//! - **Persistent LRU cache**: one file per preview, adopted again on restart
//! - **Header forwarding**: caller headers are passed on to the source server
//! - **JPEG and PNG sources**
//!
//! ## Architecture
//!
//! - [`preview`] - Fingerprints, the preview cache, the acquisition pipeline and the service
//! - [`fetch`] - Source fetching over HTTP
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//! use image_previewer::{
//!     create_router, AcquisitionPipeline, HttpFetcher, PreviewCache, PreviewService,
//!     RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = PreviewCache::open("/var/cache/previews", NonZeroUsize::new(500).unwrap()).await?;
//!     let pipeline = AcquisitionPipeline::new(HttpFetcher::new()?);
//!     let service = PreviewService::new(Arc::new(cache), pipeline);
//!
//!     let router = create_router(service, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod preview;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::{FetchError, PreviewError, StorageError};
pub use fetch::{forwardable_headers, FetchResponse, HttpFetcher, SourceFetcher};
pub use preview::{
    AcquisitionPipeline, Artifact, Dimensions, Fingerprint, PreviewCache, PreviewEncoder,
    PreviewRequest, PreviewResponse, PreviewService,
};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
