//! Snaplink - render HTML or URLs to PNG behind expiring download links.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snaplink::{
    config::Config,
    server::{create_router, normalize_root_path, RouterConfig},
    store::{ArtifactStore, Sweeper},
    WkHtmlToImage,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Snaplink v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Base URL: {}", config.base_url);
    info!("  Root path: {:?}", normalize_root_path(&config.root_path));
    info!("  Storage: {}", config.storage_dir.display());
    info!(
        "  Images: {} download(s), expire after {} day(s), served {}",
        config.max_downloads,
        config.image_expiry_days,
        if config.host_images { "inline" } else { "as attachments" }
    );
    info!(
        "  Renderer: {} (timeout {}s)",
        config.renderer_bin, config.render_timeout
    );

    // Open the artifact directory
    let store = match ArtifactStore::open(&config.storage_dir).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(
                "Failed to open storage directory {}: {}",
                config.storage_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    // Probe the rendering engine; a missing binary only fails conversions
    let renderer =
        WkHtmlToImage::new(config.renderer_bin.clone()).with_timeout(config.render_timeout());
    match renderer.version().await {
        Ok(version) => info!("  Renderer version: {}", version),
        Err(e) => {
            warn!("  Renderer check failed: {}", e);
            warn!("        Conversions will fail until '{}' is installed", config.renderer_bin);
        }
    }

    // Background sweeping is optional; conversions always sweep
    let sweeper = match config.sweep_interval() {
        Some(period) => {
            info!("  Background sweep: every {}s", period.as_secs());
            Some(Sweeper::spawn(Arc::clone(&store), period))
        }
        None => {
            info!("  Background sweep: disabled");
            None
        }
    };

    let router = create_router(renderer, store, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Server listening on http://{}{}",
        addr,
        normalize_root_path(&config.root_path)
    );

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "snaplink=debug,tower_http=debug"
    } else {
        "snaplink=info,tower_http=info"
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
    let mut router_config = RouterConfig::new(config.api_token_or_empty())
        .with_base_url(config.base_url.clone())
        .with_root_path(config.root_path.clone())
        .with_host_images(config.host_images)
        .with_policy(config.max_downloads, config.ttl());

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config.with_tracing(!config.no_tracing)
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
