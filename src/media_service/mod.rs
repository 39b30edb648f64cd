//! Client for the external media service that resolves playlists, finds
//! sources, extracts audio and embeds tags.

mod client;
mod models;

pub use client::{MediaServiceClient, AUDIO_EXTENSION_HEADER};
pub use models::*;
