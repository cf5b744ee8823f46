//! HTTP server layer for the image previewer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │              GET /fill/{width}/{height}/{*source}               │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests, error → JSON) │  │ (router, CORS, tracing)     │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    error_status, fill_handler, health_handler, AppState, ErrorResponse, FillPathParams,
    HandlerError, HealthResponse, CACHE_HIT_HEADER, DEFAULT_CACHE_MAX_AGE,
};
pub use routes::{create_router, RouterConfig};
