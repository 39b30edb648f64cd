//! Downtify Server Library
//!
//! This library exposes the internal modules for the binary and the tests.

pub mod config;
pub mod media_service;
pub mod playlist;
pub mod server;

// Re-export commonly used types for convenience
pub use playlist::{Collaborators, PlaylistManager};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
