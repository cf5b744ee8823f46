//! Cache integration tests.
//!
//! Tests verify:
//! - The number of cached previews never exceeds capacity
//! - Least recently used previews are evicted first, and hits refresh recency
//! - Cached previews survive a restart
//! - Failed acquisitions are never cached
//! - Artifacts removed behind the cache's back are recovered

use std::sync::Arc;

use axum::http::StatusCode;

use super::test_utils::{
    body_bytes, cache_hit, create_test_jpeg, file_count, get, image_dimensions, test_router,
    MockSourceFetcher, TestServer,
};

fn source(name: &str) -> String {
    format!("http://example.test/{}.jpg", name)
}

fn fill_uri(name: &str) -> String {
    format!("/fill/40/30/{}", source(name))
}

/// A fetcher serving `names` as 200x200 JPEGs.
fn fetcher_for(names: &[&str]) -> MockSourceFetcher {
    names.iter().fold(MockSourceFetcher::new(), |fetcher, name| {
        fetcher.with_source(source(name), create_test_jpeg(200, 200))
    })
}

// =============================================================================
// Capacity and Eviction
// =============================================================================

#[tokio::test]
async fn test_capacity_is_never_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let names = ["a", "b", "c", "d", "e", "f", "g"];
    let fetcher = fetcher_for(&names);
    let router = TestServer::with_capacity(3)
        .build(dir.path(), fetcher.clone())
        .await;

    for name in names {
        let response = get(&router, &fill_uri(name)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(file_count(dir.path()) <= 3);
    }

    assert_eq!(file_count(dir.path()), 3);
    assert_eq!(fetcher.request_count(), names.len());
}

#[tokio::test]
async fn test_least_recently_used_is_evicted() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher_for(&["a", "b", "c"]);
    let router = TestServer::with_capacity(2)
        .build(dir.path(), fetcher.clone())
        .await;

    get(&router, &fill_uri("a")).await;
    get(&router, &fill_uri("b")).await;
    get(&router, &fill_uri("c")).await; // evicts a

    assert_eq!(cache_hit(&get(&router, &fill_uri("c")).await), Some("true"));
    assert_eq!(cache_hit(&get(&router, &fill_uri("b")).await), Some("true"));

    let again = get(&router, &fill_uri("a")).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(cache_hit(&again), Some("false"));
    assert_eq!(fetcher.request_count(), 4);
}

#[tokio::test]
async fn test_hit_refreshes_recency() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher_for(&["a", "b", "c"]);
    let router = TestServer::with_capacity(2)
        .build(dir.path(), fetcher.clone())
        .await;

    get(&router, &fill_uri("a")).await;
    get(&router, &fill_uri("b")).await;
    assert_eq!(cache_hit(&get(&router, &fill_uri("a")).await), Some("true"));
    get(&router, &fill_uri("c")).await; // evicts b, not a

    assert_eq!(cache_hit(&get(&router, &fill_uri("a")).await), Some("true"));
    assert_eq!(cache_hit(&get(&router, &fill_uri("b")).await), Some("false"));
}

#[tokio::test]
async fn test_capacity_one() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher_for(&["a", "b"]);
    let router = TestServer::with_capacity(1)
        .build(dir.path(), fetcher.clone())
        .await;

    get(&router, &fill_uri("a")).await;
    get(&router, &fill_uri("b")).await;
    assert_eq!(file_count(dir.path()), 1);

    assert_eq!(cache_hit(&get(&router, &fill_uri("b")).await), Some("true"));
    assert_eq!(cache_hit(&get(&router, &fill_uri("a")).await), Some("false"));
}

#[tokio::test]
async fn test_same_source_different_sizes_are_separate_entries() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher_for(&["a"]);
    let router = test_router(dir.path(), fetcher.clone()).await;

    let wide = get(&router, &format!("/fill/100/50/{}", source("a"))).await;
    let tall = get(&router, &format!("/fill/50/100/{}", source("a"))).await;

    assert_eq!(image_dimensions(&body_bytes(wide).await), (100, 50));
    assert_eq!(image_dimensions(&body_bytes(tall).await), (50, 100));
    assert_eq!(file_count(dir.path()), 2);
    assert_eq!(fetcher.request_count(), 2);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let router = test_router(dir.path(), fetcher_for(&["a"])).await;
        assert_eq!(get(&router, &fill_uri("a")).await.status(), StatusCode::OK);
    }

    // The new instance has no source at all; the preview must come from disk
    let fetcher = MockSourceFetcher::new();
    let router = test_router(dir.path(), fetcher.clone()).await;

    let response = get(&router, &fill_uri("a")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_hit(&response), Some("true"));
    assert_eq!(image_dimensions(&body_bytes(response).await), (40, 30));
    assert_eq!(fetcher.request_count(), 0);
}

#[tokio::test]
async fn test_restart_with_smaller_capacity_trims() {
    let dir = tempfile::tempdir().unwrap();

    {
        let router = TestServer::with_capacity(4)
            .build(dir.path(), fetcher_for(&["a", "b", "c", "d"]))
            .await;
        for name in ["a", "b", "c", "d"] {
            get(&router, &fill_uri(name)).await;
        }
    }
    assert_eq!(file_count(dir.path()), 4);

    let _router = TestServer::with_capacity(2)
        .build(dir.path(), MockSourceFetcher::new())
        .await;
    assert_eq!(file_count(dir.path()), 2);
}

// =============================================================================
// Failures and Recovery
// =============================================================================

#[tokio::test]
async fn test_failed_acquisition_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MockSourceFetcher::new();
    let router = test_router(dir.path(), fetcher.clone()).await;

    for _ in 0..3 {
        let response = get(&router, &fill_uri("missing")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    assert_eq!(fetcher.request_count(), 3);
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn test_failed_acquisition_keeps_existing_entries() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher_for(&["a", "b"]);
    let router = TestServer::with_capacity(2)
        .build(dir.path(), fetcher.clone())
        .await;

    get(&router, &fill_uri("a")).await;
    get(&router, &fill_uri("b")).await;

    // A failure must not evict anything
    let response = get(&router, &fill_uri("missing")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    assert_eq!(cache_hit(&get(&router, &fill_uri("a")).await), Some("true"));
    assert_eq!(cache_hit(&get(&router, &fill_uri("b")).await), Some("true"));
}

#[tokio::test]
async fn test_removed_artifact_is_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher_for(&["a"]);
    let router = test_router(dir.path(), fetcher.clone()).await;

    get(&router, &fill_uri("a")).await;

    // External cleanup removes the artifact file
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }

    let response = get(&router, &fill_uri("a")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_hit(&response), Some("false"));
    assert_eq!(fetcher.request_count(), 2);
    assert_eq!(file_count(dir.path()), 1);

    assert_eq!(cache_hit(&get(&router, &fill_uri("a")).await), Some("true"));
}

#[tokio::test]
async fn test_concurrent_requests_stay_within_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let names: Vec<String> = (0..12).map(|i| format!("img{}", i)).collect();
    let fetcher = names.iter().fold(MockSourceFetcher::new(), |fetcher, name| {
        fetcher.with_source(source(name), create_test_jpeg(120, 90))
    });
    let router = Arc::new(
        TestServer::with_capacity(4)
            .build(dir.path(), fetcher.clone())
            .await,
    );

    let mut handles = Vec::new();
    for name in names.iter().chain(names.iter()) {
        let router = Arc::clone(&router);
        let uri = fill_uri(name);
        handles.push(tokio::spawn(async move { get(&router, &uri).await.status() }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(file_count(dir.path()), 4);
}
