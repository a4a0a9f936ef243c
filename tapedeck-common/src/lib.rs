//! # Tapedeck Common Library
//!
//! Shared code for the Tapedeck services including:
//! - Event types (TapedeckEvent enum) and the EventBus
//! - Configuration file loading and default path resolution
//! - Common error types

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
