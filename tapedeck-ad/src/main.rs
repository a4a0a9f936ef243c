//! tapedeck-ad - Audio Download service
//!
//! Fetches audio from media URLs through an external extractor, applies
//! optional tempo adjustment, and manages the two-area library
//! (scratch, finalized) over an HTTP REST API with SSE job events.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapedeck_ad::config::{Args, Config};
use tapedeck_ad::services::AudioTranscoder;
use tapedeck_ad::AppState;
use tapedeck_common::config::ConfigFile;
use tapedeck_common::events::EventBus;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapedeck_ad=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments over the config file
    let args = Args::parse();
    let config = Config::resolve(args, ConfigFile::load());

    info!("Starting tapedeck-ad (Audio Download) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Scratch directory: {}", config.scratch_dir.display());
    info!("Finalized directory: {}", config.finalized_dir.display());

    config
        .ensure_directories()
        .context("Failed to create storage directories")?;

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100); // 100 event capacity

    // Create application state
    let state = AppState::new(&config, event_bus);

    if !state.extractor.probe() {
        warn!(
            "Extractor binary '{}' not found; downloads will fail until it is installed",
            config.ytdlp_bin
        );
    }
    if !AudioTranscoder::new(&config.ffmpeg_bin).is_available() {
        warn!(
            "Transcoder binary '{}' not found; speed adjustment will fail",
            config.ffmpeg_bin
        );
    }

    // Build router
    let app = tapedeck_ad::build_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
