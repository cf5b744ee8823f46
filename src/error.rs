use thiserror::Error;

/// Errors from the durable artifact store.
///
/// Paths and messages are kept as strings so the error stays `Clone` and can
/// be handed to several waiters or logged after being returned.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Artifact file could not be written or moved into place
    #[error("Failed to create artifact {path}: {message}")]
    Create { path: String, message: String },

    /// Artifact file exists but could not be read
    #[error("Failed to read artifact {path}: {message}")]
    Read { path: String, message: String },

    /// Artifact file could not be deleted
    #[error("Failed to remove artifact {path}: {message}")]
    Remove { path: String, message: String },

    /// Modification time of the artifact could not be refreshed
    #[error("Failed to touch artifact {path}: {message}")]
    Touch { path: String, message: String },

    /// Cache directory could not be created or listed
    #[error("Failed to scan cache directory {path}: {message}")]
    Scan { path: String, message: String },

    /// Artifact file disappeared from the cache directory
    #[error("Artifact missing from store: {path}")]
    Missing { path: String },
}

impl StorageError {
    /// Returns `true` if the artifact file no longer exists on disk.
    pub fn is_missing(&self) -> bool {
        matches!(self, StorageError::Missing { .. })
    }
}

/// Errors from the source fetch collaborator.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The URL could not be turned into a request
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network, TLS or protocol failure before a status was received
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors returned by the preview service.
///
/// Every variant is a distinct failure kind the caller can match on; the
/// service never retries and never falls back to another kind.
#[derive(Debug, Clone, Error)]
pub enum PreviewError {
    /// Requested width or height is zero or above the configured bound
    #[error("Invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Source locator is empty or not an http(s) URL
    #[error("Invalid source locator '{locator}': {reason}")]
    InvalidSourceLocator { locator: String, reason: String },

    /// Source answered with a non-2xx status or could not be reached
    #[error("Source unavailable ({locator}): {reason}")]
    SourceUnavailable { locator: String, reason: String },

    /// Source bytes are not a decodable image
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Source image is smaller than the requested preview
    #[error(
        "Requested {width}x{height} exceeds source image {source_width}x{source_height}"
    )]
    DimensionsExceedSource {
        source_width: u32,
        source_height: u32,
        width: u32,
        height: u32,
    },

    /// Artifact store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Encoding the preview failed or a blocking worker panicked
    #[error("Processing error: {message}")]
    Processing { message: String },
}
