use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::playlist::PlaylistManager;

use super::ServerConfig;

pub type GuardedPlaylistManager = Arc<PlaylistManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub playlist_manager: GuardedPlaylistManager,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedPlaylistManager {
    fn from_ref(input: &ServerState) -> Self {
        input.playlist_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
