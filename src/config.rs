//! Configuration management for the image previewer.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `PREVIEW_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use image_previewer::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//!
//! println!("Listening on {}", config.bind_address());
//! println!("Cache: {} previews in {}", config.cache_size, config.cache_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! - `PREVIEW_HOST` - Server bind address (default: 0.0.0.0)
//! - `PREVIEW_PORT` - Server port (default: 8080)
//! - `PREVIEW_CACHE_DIR` - Directory holding cached previews (required)
//! - `PREVIEW_CACHE_SIZE` - Max number of cached previews (required)
//! - `PREVIEW_JPEG_QUALITY` - JPEG quality of previews (default: 80)
//! - `PREVIEW_ALLOW_UPSCALE` - Upscale sources smaller than the request (default: false)
//! - `PREVIEW_MAX_DIMENSION` - Largest accepted width or height (default: 4096)
//! - `PREVIEW_FETCH_TIMEOUT` - Source fetch timeout in seconds (default: 30)
//! - `PREVIEW_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `PREVIEW_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::preview::{is_valid_quality, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION};
use crate::server::DEFAULT_CACHE_MAX_AGE;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default source fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image previewer - serves exact-size JPEG previews of remote images.
///
/// Fetches the source image over HTTP, fill-resizes it to the requested
/// width and height, and keeps the result in a bounded on-disk LRU cache.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-previewer")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PREVIEW_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PREVIEW_PORT")]
    pub port: u16,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Directory holding cached previews. Created if missing.
    #[arg(long, env = "PREVIEW_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Maximum number of previews kept in the cache.
    #[arg(long, env = "PREVIEW_CACHE_SIZE")]
    pub cache_size: usize,

    // =========================================================================
    // Preview Configuration
    // =========================================================================
    /// JPEG quality of generated previews (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "PREVIEW_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Upscale sources smaller than the requested size instead of rejecting them.
    #[arg(long, default_value_t = false, env = "PREVIEW_ALLOW_UPSCALE")]
    pub allow_upscale: bool,

    /// Largest accepted preview width or height in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "PREVIEW_MAX_DIMENSION")]
    pub max_dimension: u32,

    /// Timeout in seconds for fetching a source image.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "PREVIEW_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "PREVIEW_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PREVIEW_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(
                "Cache directory is required. Set --cache-dir or PREVIEW_CACHE_DIR".to_string(),
            );
        }

        if self.cache_size == 0 {
            return Err("cache_size must be greater than 0".to_string());
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.max_dimension == 0 {
            return Err("max_dimension must be greater than 0".to_string());
        }

        if self.fetch_timeout == 0 {
            return Err("fetch_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cache capacity, or `None` if it is zero (call validate() first).
    pub fn cache_capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.cache_size)
    }

    /// Source fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

// =============================================================================
// Tests
// =============================================================================
