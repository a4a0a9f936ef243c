//! HTTP API handlers for tapedeck-ad
//!
//! REST endpoints plus an SSE stream for job lifecycle events.

pub mod download;
pub mod events;
pub mod files;
pub mod health;
pub mod preview;

pub use download::download_routes;
pub use events::event_stream;
pub use files::file_routes;
pub use health::health_routes;
pub use preview::preview_routes;
