//! HTTP request handlers for the preview API.
//!
//! # Endpoints
//!
//! - `GET /fill/{width}/{height}/{*source}` - Serve a fill-resized preview
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, RawQuery, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::PreviewError;
use crate::fetch::{forwardable_headers, SourceFetcher};
use crate::preview::{PreviewRequest, PreviewService};

/// Response header telling whether the preview came from the cache.
pub const CACHE_HIT_HEADER: &str = "x-preview-cache-hit";

/// Default `Cache-Control` max-age in seconds.
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the preview service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F: SourceFetcher> {
    /// The preview service for processing fill requests
    pub preview_service: Arc<PreviewService<F>>,

    /// Cache control max-age in seconds for served previews
    pub cache_max_age: u32,
}

impl<F: SourceFetcher> AppState<F> {
    /// Create a new application state with the given preview service.
    pub fn new(preview_service: PreviewService<F>) -> Self {
        Self {
            preview_service: Arc::new(preview_service),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(preview_service: PreviewService<F>, cache_max_age: u32) -> Self {
        Self {
            preview_service: Arc::new(preview_service),
            cache_max_age,
        }
    }
}

impl<F: SourceFetcher> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            preview_service: Arc::clone(&self.preview_service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for fill requests.
///
/// Extracted from: `/fill/{width}/{height}/{*source}`. Width and height are
/// kept as strings so malformed values get a JSON error like every other
/// validation failure.
#[derive(Debug, Deserialize)]
pub struct FillPathParams {
    /// Requested width in pixels
    pub width: String,

    /// Requested height in pixels
    pub height: String,

    /// Source image locator, with or without scheme
    pub source: String,
}

impl FillPathParams {
    /// Parse the requested width.
    pub fn width(&self) -> Result<u32, HandlerError> {
        parse_dimension("width", &self.width)
    }

    /// Parse the requested height.
    pub fn height(&self) -> Result<u32, HandlerError> {
        parse_dimension("height", &self.height)
    }

    /// The source locator with the request's query string re-attached.
    pub fn source_with_query(&self, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.source, q),
            _ => self.source.clone(),
        }
    }
}

fn parse_dimension(name: &'static str, value: &str) -> Result<u32, HandlerError> {
    value.parse().map_err(|_| HandlerError::MalformedDimension {
        name,
        value: value.to_string(),
    })
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_dimensions", "source_unavailable")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Status code and error type identifier for a preview error.
pub fn error_status(err: &PreviewError) -> (StatusCode, &'static str) {
    match err {
        PreviewError::InvalidDimensions { .. } => (StatusCode::BAD_REQUEST, "invalid_dimensions"),
        PreviewError::InvalidSourceLocator { .. } => (StatusCode::BAD_REQUEST, "invalid_source"),
        PreviewError::SourceUnavailable { .. } => (StatusCode::BAD_GATEWAY, "source_unavailable"),
        PreviewError::UnsupportedFormat { .. } => {
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
        }
        PreviewError::DimensionsExceedSource { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "dimensions_exceed_source")
        }
        PreviewError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        PreviewError::Processing { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "processing_error"),
    }
}

/// Build a JSON error response, logging it according to its severity:
/// - 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
fn error_response(status: StatusCode, error_type: &'static str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status.is_client_error() {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

impl IntoResponse for PreviewError {
    fn into_response(self) -> Response {
        let (status, error_type) = error_status(&self);
        error_response(status, error_type, self.to_string())
    }
}

/// Errors returned by the fill handler.
#[derive(Debug)]
pub enum HandlerError {
    /// Width or height path segment is not a non-negative integer
    MalformedDimension { name: &'static str, value: String },

    /// Path segments could not be decoded (e.g. invalid percent-encoding)
    MalformedPath { message: String },

    /// The preview service failed
    Preview(PreviewError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::MalformedDimension { name, value } => error_response(
                StatusCode::BAD_REQUEST,
                "invalid_dimensions",
                format!("Invalid {}: '{}' is not an integer", name, value),
            ),
            HandlerError::MalformedPath { message } => error_response(
                StatusCode::BAD_REQUEST,
                "invalid_source",
                format!("Invalid request path: {}", message),
            ),
            HandlerError::Preview(err) => err.into_response(),
        }
    }
}

impl From<PathRejection> for HandlerError {
    fn from(rejection: PathRejection) -> Self {
        HandlerError::MalformedPath {
            message: rejection.body_text(),
        }
    }
}

impl From<PreviewError> for HandlerError {
    fn from(err: PreviewError) -> Self {
        HandlerError::Preview(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle fill requests.
///
/// # Endpoint
///
/// `GET /fill/{width}/{height}/{*source}`
///
/// # Path Parameters
///
/// - `width`, `height`: Exact size of the preview in pixels
/// - `source`: Source image URL; `http://` is assumed when no scheme is given.
///   The request's query string is passed on to the source URL.
///
/// Request headers other than hop-by-hop ones are forwarded to the source.
///
/// # Response
///
/// - `200 OK`: JPEG preview with `Content-Type: image/jpeg`
/// - `400 Bad Request`: Invalid dimensions or source URL
/// - `415 Unsupported Media Type`: Source is not a JPEG or PNG image
/// - `422 Unprocessable Entity`: Source is smaller than the requested size
/// - `502 Bad Gateway`: Source could not be fetched
/// - `500 Internal Server Error`: Cache storage or encoding failure
///
/// # Headers
///
/// - `Content-Type: image/jpeg`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Preview-Cache-Hit: true|false`
pub async fn fill_handler<F: SourceFetcher + 'static>(
    State(state): State<AppState<F>>,
    params: Result<Path<FillPathParams>, PathRejection>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let Path(params) = params?;
    let width = params.width()?;
    let height = params.height()?;
    let source = params.source_with_query(query.as_deref());

    debug!(source = %source, width, height, "Fill request");

    let request =
        PreviewRequest::new(source, width, height).with_headers(forwardable_headers(&headers));
    let response = state.preview_service.get_preview(request).await?;

    let http_response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.cache_max_age),
            ),
            (
                HeaderName::from_static(CACHE_HIT_HEADER),
                response.cache_hit.to_string(),
            ),
        ],
        Body::from(response.artifact.data),
    )
        .into_response();

    Ok(http_response)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
