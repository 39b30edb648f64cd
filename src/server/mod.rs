pub mod config;
mod http_layers;
pub mod metrics;
mod playlist_routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use playlist_routes::StartPlaylistResponse;
pub use server::{make_app, run_server, HealthResponse};
