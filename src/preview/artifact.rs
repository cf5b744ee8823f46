use std::io::Cursor;

use bytes::Bytes;
use image::{ImageFormat, ImageReader};

/// An encoded preview image together with its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// JPEG-encoded image bytes
    pub data: Bytes,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl Artifact {
    /// Wrap already-encoded JPEG bytes whose size is known.
    pub fn new(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
        }
    }

    /// Build an artifact from stored JPEG bytes, reading the size from the
    /// image header.
    ///
    /// Fails if the bytes are not a readable JPEG.
    pub fn from_jpeg(data: Bytes) -> Result<Self, String> {
        let reader = ImageReader::with_format(Cursor::new(&data[..]), ImageFormat::Jpeg);
        let (width, height) = reader.into_dimensions().map_err(|e| e.to_string())?;

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Size of the encoded image in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the artifact carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
