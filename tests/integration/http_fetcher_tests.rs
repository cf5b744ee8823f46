//! End-to-end tests over real sockets.
//!
//! A small axum app on an ephemeral local port plays the remote image host;
//! the previewer talks to it through [`HttpFetcher`], so these tests cover
//! the reqwest transport, header forwarding and status handling.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get as get_route;
use axum::Router;
use url::Url;

use image_previewer::{
    create_router, AcquisitionPipeline, FetchError, HttpFetcher, PreviewCache, PreviewService,
    RouterConfig, SourceFetcher,
};

use super::test_utils::{
    body_bytes, body_json, cache_hit, create_test_jpeg, get, image_dimensions,
};

const TOKEN: &str = "let-me-in";

// =============================================================================
// Source Server
// =============================================================================

/// Start an image host on 127.0.0.1 and return its `host:port`.
async fn start_source_server() -> String {
    let photo = create_test_jpeg(640, 480);
    let private = photo.clone();

    let app = Router::new()
        .route(
            "/photo.jpg",
            get_route(move || {
                let photo = photo.clone();
                async move { ([("content-type", "image/jpeg")], photo) }
            }),
        )
        .route(
            "/private.jpg",
            get_route(move |headers: HeaderMap| {
                let private = private.clone();
                async move {
                    match headers.get("x-token").and_then(|v| v.to_str().ok()) {
                        Some(TOKEN) => (StatusCode::OK, private).into_response(),
                        _ => StatusCode::FORBIDDEN.into_response(),
                    }
                }
            }),
        )
        .route("/page.html", get_route(|| async { "<html></html>" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr.to_string()
}

/// A `host:port` with nothing listening on it.
async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

async fn previewer(dir: &std::path::Path) -> Router {
    let cache = PreviewCache::open(dir, NonZeroUsize::new(10).unwrap())
        .await
        .unwrap();
    let fetcher = HttpFetcher::with_timeout(Duration::from_secs(5)).unwrap();
    let service = PreviewService::new(Arc::new(cache), AcquisitionPipeline::new(fetcher));

    create_router(service, RouterConfig::new().with_tracing(false))
}

// =============================================================================
// HttpFetcher
// =============================================================================

#[tokio::test]
async fn test_fetcher_returns_body_and_status() {
    let host = start_source_server().await;
    let fetcher = HttpFetcher::new().unwrap();

    let ok = fetcher
        .get(
            &Url::parse(&format!("http://{}/photo.jpg", host)).unwrap(),
            &HeaderMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(image_dimensions(&ok.body), (640, 480));

    // Non-2xx statuses are reported, not turned into errors
    let missing = fetcher
        .get(
            &Url::parse(&format!("http://{}/nope.jpg", host)).unwrap(),
            &HeaderMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fetcher_sends_headers() {
    let host = start_source_server().await;
    let fetcher = HttpFetcher::new().unwrap();
    let url = Url::parse(&format!("http://{}/private.jpg", host)).unwrap();

    let denied = fetcher.get(&url, &HeaderMap::new()).await.unwrap();
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let mut headers = HeaderMap::new();
    headers.insert("x-token", TOKEN.parse().unwrap());
    let allowed = fetcher.get(&url, &headers).await.unwrap();
    assert_eq!(allowed.status, StatusCode::OK);
}

#[tokio::test]
async fn test_fetcher_connection_refused() {
    let addr = closed_address().await;
    let fetcher = HttpFetcher::new().unwrap();

    let result = fetcher
        .get(
            &Url::parse(&format!("http://{}/photo.jpg", addr)).unwrap(),
            &HeaderMap::new(),
        )
        .await;
    assert!(matches!(result, Err(FetchError::Transport(_))));
}

// =============================================================================
// Full Service
// =============================================================================

#[tokio::test]
async fn test_preview_over_http() {
    let host = start_source_server().await;
    let dir = tempfile::tempdir().unwrap();
    let router = previewer(dir.path()).await;
    let uri = format!("/fill/320/100/{}/photo.jpg", host);

    let first = get(&router, &uri).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_hit(&first), Some("false"));
    assert_eq!(image_dimensions(&body_bytes(first).await), (320, 100));

    let second = get(&router, &uri).await;
    assert_eq!(cache_hit(&second), Some("true"));
}

#[tokio::test]
async fn test_forwarded_header_reaches_source() {
    let host = start_source_server().await;
    let dir = tempfile::tempdir().unwrap();
    let router = previewer(dir.path()).await;
    let uri = format!("/fill/64/64/http://{}/private.jpg", host);

    let denied = get(&router, &uri).await;
    assert_eq!(denied.status(), StatusCode::BAD_GATEWAY);

    let request = axum::http::Request::builder()
        .uri(&uri)
        .header("x-token", TOKEN)
        .body(axum::body::Body::empty())
        .unwrap();
    let allowed = tower::ServiceExt::oneshot(router.clone(), request)
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_non_image_over_http() {
    let host = start_source_server().await;
    let dir = tempfile::tempdir().unwrap();
    let router = previewer(dir.path()).await;

    let response = get(&router, &format!("/fill/10/10/{}/page.html", host)).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_unreachable_source_over_http() {
    let addr = closed_address().await;
    let dir = tempfile::tempdir().unwrap();
    let router = previewer(dir.path()).await;

    let response = get(&router, &format!("/fill/10/10/{}/photo.jpg", addr)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error = body_json(response).await;
    assert_eq!(error["error"], "source_unavailable");
}
