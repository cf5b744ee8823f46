//! Fingerprints for cached previews.
//!
//! A fingerprint names one (source, dimensions) pair. It doubles as the file
//! name of the stored artifact, so it only ever contains lowercase hex
//! digits, digits, `_` and `x`:
//!
//! ```text
//! <32 hex chars of SHA-256(locator)>_<width>x<height>
//! ```

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::PreviewError;

/// Number of digest bytes kept in a fingerprint (32 hex characters).
const DIGEST_BYTES: usize = 16;

// =============================================================================
// Dimensions
// =============================================================================

/// Target size of a preview. Both sides are at least 1 pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    /// Create dimensions, rejecting a zero width or height.
    pub fn new(width: u32, height: u32) -> Result<Self, PreviewError> {
        if width == 0 {
            return Err(PreviewError::InvalidDimensions {
                width,
                height,
                reason: "width should be greater than 0".to_string(),
            });
        }
        if height == 0 {
            return Err(PreviewError::InvalidDimensions {
                width,
                height,
                reason: "height should be greater than 0".to_string(),
            });
        }

        Ok(Self { width, height })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `true` if an image of `width`x`height` covers these dimensions
    /// in both axes.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width <= width && self.height <= height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// =============================================================================
// Fingerprint
// =============================================================================

/// Cache key of a preview, also used as its artifact file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint of `locator` rendered at `dimensions`.
    ///
    /// Pure and total: any string is accepted, including ones that are not
    /// valid URLs.
    pub fn resolve(locator: &str, dimensions: Dimensions) -> Self {
        let digest = Sha256::digest(locator.as_bytes());
        let hash = hex::encode(&digest[..DIGEST_BYTES]);

        Fingerprint(format!("{}_{}", hash, dimensions))
    }

    /// Recognize a fingerprint from an artifact file name.
    ///
    /// Returns `None` for names that `resolve` could never have produced,
    /// such as temporary files or foreign files in the cache directory.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (hash, dims) = name.split_once('_')?;

        if hash.len() != DIGEST_BYTES * 2
            || !hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }

        let (width, height) = dims.split_once('x')?;
        let is_positive = |s: &str| {
            !s.is_empty()
                && !s.starts_with('0')
                && s.bytes().all(|b| b.is_ascii_digit())
                && s.parse::<u32>().is_ok()
        };
        if !is_positive(width) || !is_positive(height) {
            return None;
        }

        Some(Fingerprint(name.to_string()))
    }

    /// The fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Tests
// =============================================================================
