//! Preview rendering.
//!
//! Turns raw source bytes into a JPEG preview of an exact size:
//!
//! 1. Decode the source (JPEG or PNG)
//! 2. Check the source covers the requested size, unless upscaling is allowed
//! 3. Fill-resize: scale until both sides cover the target, then center-crop
//! 4. Encode as JPEG at the configured quality
//!
//! All of this is CPU-bound and synchronous; callers on the async runtime
//! run it on the blocking pool.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use super::artifact::Artifact;
use super::fingerprint::Dimensions;
use crate::error::PreviewError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Resampling filter used for fill-resizing.
const FILL_FILTER: FilterType = FilterType::Lanczos3;

// =============================================================================
// Preview Encoder
// =============================================================================

/// Decodes source images and renders fill-resized JPEG previews.
#[derive(Debug, Clone)]
pub struct PreviewEncoder {
    quality: u8,
    allow_upscale: bool,
}

impl PreviewEncoder {
    /// Create an encoder with the default quality that rejects sources
    /// smaller than the requested preview.
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            allow_upscale: false,
        }
    }

    /// Set the JPEG quality; out-of-range values are clamped.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = clamp_quality(quality);
        self
    }

    /// Allow or forbid upscaling sources smaller than the requested preview.
    pub fn with_upscale(mut self, allow_upscale: bool) -> Self {
        self.allow_upscale = allow_upscale;
        self
    }

    /// JPEG quality used for previews.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Whether small sources are upscaled instead of rejected.
    pub fn allows_upscale(&self) -> bool {
        self.allow_upscale
    }

    /// Render a `dimensions`-sized JPEG preview of `source`.
    ///
    /// # Errors
    ///
    /// - [`PreviewError::UnsupportedFormat`] if `source` is not a decodable image
    /// - [`PreviewError::DimensionsExceedSource`] if the source is smaller than
    ///   `dimensions` and upscaling is not allowed
    /// - [`PreviewError::Processing`] if JPEG encoding fails
    pub fn render(&self, source: &[u8], dimensions: Dimensions) -> Result<Artifact, PreviewError> {
        let img = self.decode(source)?;

        if !self.allow_upscale && !dimensions.fits_within(img.width(), img.height()) {
            return Err(PreviewError::DimensionsExceedSource {
                source_width: img.width(),
                source_height: img.height(),
                width: dimensions.width(),
                height: dimensions.height(),
            });
        }

        let preview = fill(&img, dimensions);
        self.encode(&preview)
    }

    /// Decode source bytes, guessing the format from their content.
    pub fn decode(&self, source: &[u8]) -> Result<DynamicImage, PreviewError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| PreviewError::UnsupportedFormat {
                reason: e.to_string(),
            })?;

        if reader.format().is_none() {
            return Err(PreviewError::UnsupportedFormat {
                reason: "unrecognized image format".to_string(),
            });
        }

        reader.decode().map_err(|e| PreviewError::UnsupportedFormat {
            reason: e.to_string(),
        })
    }

    /// Encode an image as JPEG.
    ///
    /// JPEG has no alpha channel and no 16-bit samples, so anything other
    /// than 8-bit gray or RGB is converted to 8-bit RGB first.
    pub fn encode(&self, img: &DynamicImage) -> Result<Artifact, PreviewError> {
        let converted;
        let img = match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
            other => {
                converted = DynamicImage::ImageRgb8(other.to_rgb8());
                &converted
            }
        };

        let mut output = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut output, self.quality))
            .map_err(|e| PreviewError::Processing {
                message: e.to_string(),
            })?;

        Ok(Artifact::new(output, img.width(), img.height()))
    }
}

impl Default for PreviewEncoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Scale `img` so it covers `dimensions`, then crop the center to exactly
/// that size.
pub fn fill(img: &DynamicImage, dimensions: Dimensions) -> DynamicImage {
    img.resize_to_fill(dimensions.width(), dimensions.height(), FILL_FILTER)
}

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
