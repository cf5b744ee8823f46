//! Source fetch layer.
//!
//! Fetching source images is delegated to a [`SourceFetcher`], which turns a
//! URL plus caller headers into a status code and a body. The preview
//! pipeline only depends on this trait; [`HttpFetcher`] is the production
//! implementation backed by `reqwest`, and tests plug in their own fetchers.

mod http_fetcher;
mod source;

pub use http_fetcher::{HttpFetcher, DEFAULT_FETCH_TIMEOUT};
pub use source::{forwardable_headers, FetchResponse, SourceFetcher};
