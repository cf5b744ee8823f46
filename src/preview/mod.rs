//! Preview layer.
//!
//! This module turns (source URL, width, height) requests into exact-size
//! JPEG previews, caching the results on disk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             Preview Service             │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ PreviewCache │  │   Acquisition   │  │
//! │  │ (LRU index + │  │    Pipeline     │  │
//! │  │  files)      │  │ (fetch → fill)  │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              SourceFetcher              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`PreviewService`]: Entry point for preview requests, orchestrates validation, cache and pipeline
//! - [`PreviewCache`]: Bounded LRU cache whose entries are artifact files in a directory
//! - [`Fingerprint`]: Cache key and file name derived from (source, dimensions)
//! - [`AcquisitionPipeline`]: Fetches a source image and renders it on a cache miss
//! - [`PreviewEncoder`]: Decode, fill-resize and JPEG-encode
//! - [`PreviewRequest`] / [`PreviewResponse`]: Service input and output
//!
//! # Example
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//! use image_previewer::fetch::HttpFetcher;
//! use image_previewer::preview::{
//!     AcquisitionPipeline, PreviewCache, PreviewRequest, PreviewService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = PreviewCache::open("/tmp/previews", NonZeroUsize::new(100).unwrap()).await?;
//!     let pipeline = AcquisitionPipeline::new(HttpFetcher::new()?);
//!     let service = PreviewService::new(Arc::new(cache), pipeline);
//!
//!     let preview = service
//!         .get_preview(PreviewRequest::new("example.com/photo.jpg", 300, 200))
//!         .await?;
//!     println!("{} bytes, cache hit: {}", preview.artifact.len(), preview.cache_hit);
//!     Ok(())
//! }
//! ```

mod artifact;
mod cache;
mod encoder;
mod fingerprint;
mod pipeline;
mod service;
mod store;

pub use artifact::Artifact;
pub use cache::PreviewCache;
pub use encoder::{
    clamp_quality, fill, is_valid_quality, PreviewEncoder, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY,
    MIN_JPEG_QUALITY,
};
pub use fingerprint::{Dimensions, Fingerprint};
pub use pipeline::AcquisitionPipeline;
pub use service::{
    parse_source_locator, PreviewRequest, PreviewResponse, PreviewService, DEFAULT_MAX_DIMENSION,
};
