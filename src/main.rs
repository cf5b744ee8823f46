//! Image previewer - serves exact-size JPEG previews of remote images.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_previewer::{
    config::Config,
    fetch::HttpFetcher,
    preview::{AcquisitionPipeline, PreviewCache, PreviewEncoder, PreviewService},
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    run_serve(config).await
}

async fn run_serve(config: Config) -> ExitCode {
    let Some(capacity) = config.cache_capacity() else {
        error!("Configuration error: cache_size must be greater than 0");
        return ExitCode::FAILURE;
    };

    info!("Configuration:");
    info!("  Cache: {} previews in {}", capacity, config.cache_dir.display());
    info!(
        "  Previews: JPEG quality {}, max {}px, upscaling {}",
        config.jpeg_quality,
        config.max_dimension,
        if config.allow_upscale { "allowed" } else { "rejected" }
    );
    info!("  Fetch timeout: {}s", config.fetch_timeout);

    let cache = match PreviewCache::open(&config.cache_dir, capacity).await {
        Ok(cache) => cache,
        Err(e) => {
            error!("Failed to open preview cache: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpFetcher::with_timeout(config.fetch_timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let encoder = PreviewEncoder::new()
        .with_quality(config.jpeg_quality)
        .with_upscale(config.allow_upscale);
    let pipeline = AcquisitionPipeline::new(fetcher).with_encoder(encoder);
    let preview_service = PreviewService::new(Arc::new(cache), pipeline)
        .with_max_dimension(config.max_dimension);

    let router = create_router(preview_service, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  Try: curl -o preview.jpg http://{}/fill/300/200/<image-url>", addr);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_previewer=debug,tower_http=debug"
    } else {
        "image_previewer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
