//! tapedeck-ad library interface
//!
//! Exposes the application state and router for integration testing

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tapedeck_common::events::EventBus;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::services::extractor::MediaExtractor;
use crate::services::registry::FileRegistry;
use crate::services::runner::JobRunner;
use crate::services::transcoder::AudioTranscoder;
use crate::store::JobStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Download job table
    pub store: JobStore,
    /// Scratch/finalized library access
    pub registry: FileRegistry,
    /// Media extraction adapter
    pub extractor: MediaExtractor,
    /// Background pipeline executor
    pub runner: JobRunner,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last pipeline failure for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: &Config, event_bus: EventBus) -> Self {
        let store = JobStore::new(event_bus.clone());
        let registry = FileRegistry::new(
            config.scratch_dir.clone(),
            config.finalized_dir.clone(),
            &config.ffmpeg_bin,
            &config.ffprobe_bin,
        );
        let extractor = MediaExtractor::new(&config.ytdlp_bin);
        let transcoder = AudioTranscoder::new(&config.ffmpeg_bin);
        let last_error = Arc::new(RwLock::new(None));
        let runner = JobRunner::new(
            store.clone(),
            extractor.clone(),
            transcoder,
            registry.clone(),
            last_error.clone(),
        );

        Self {
            store,
            registry,
            extractor,
            runner,
            event_bus,
            startup_time: Utc::now(),
            last_error,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::preview_routes())
        .merge(api::download_routes())
        .merge(api::file_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
