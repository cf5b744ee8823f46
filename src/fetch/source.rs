use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::error::FetchError;

/// Raw outcome of a source fetch.
///
/// A non-2xx status is not an error at this level; the caller decides what
/// to do with it.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status returned by the source
    pub status: StatusCode,

    /// Response body
    pub body: Bytes,
}

impl FetchResponse {
    /// Create a new fetch response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for fetching source images.
///
/// Implementations own every transport concern (redirects, TLS, pooling,
/// timeouts). They must be thread-safe since one fetcher is shared by all
/// in-flight requests.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Issue a GET for `url`, sending `headers` along with the request.
    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<FetchResponse, FetchError>;
}

/// Returns `true` for headers that describe the inbound connection rather
/// than the request, which must not be replayed against the source.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    let name = name.as_str();
    matches!(
        name,
        "host"
            | "connection"
            | "content-length"
            | "transfer-encoding"
            | "upgrade"
            | "te"
            | "trailer"
            | "keep-alive"
            // The fetcher does not decompress bodies
            | "accept-encoding"
    ) || name.starts_with("proxy-")
}

/// Select the inbound headers that may be forwarded to the source.
///
/// Multi-valued headers keep all of their values.
pub fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(inbound.len());

    for (name, value) in inbound {
        if is_hop_by_hop(name) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }

    forwarded
}
