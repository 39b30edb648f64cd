//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own work directory.

use super::constants::*;
use super::fixtures::fake_collaborators;
use downtify_server::config::PlaylistSettings;
use downtify_server::playlist::{FileStore, PlaylistManager};
use downtify_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated work directory
///
/// When dropped, the server gracefully shuts down and the work directory is
/// removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Manager behind the server, for direct inspection in tests
    pub playlist_manager: Arc<PlaylistManager>,

    // Private fields - keep resources alive until drop
    _temp_work_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the work directory cannot be created, binding fails or the
    /// server doesn't become ready within timeout.
    pub async fn spawn() -> Self {
        let temp_work_dir = TempDir::new().expect("Failed to create work dir");

        let settings = PlaylistSettings {
            workers: TEST_WORKERS,
            track_timeout: Duration::from_secs(5),
            job_retention: None,
            ..PlaylistSettings::default()
        };
        let file_store = Arc::new(FileStore::new(temp_work_dir.path()));
        file_store.init().await.expect("Failed to init file store");
        let playlist_manager = Arc::new(PlaylistManager::new(
            settings,
            fake_collaborators(),
            file_store,
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..ServerConfig::default()
        };

        let app = make_app(config, playlist_manager.clone()).expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            playlist_manager,
            _temp_work_dir: temp_work_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Root directory under which job directories are created
    pub fn work_dir(&self) -> &Path {
        self._temp_work_dir.path()
    }

    /// Waits for the server to become ready by polling the /health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
