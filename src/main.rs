use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use downtify_server::config;
use downtify_server::media_service::MediaServiceClient;
use downtify_server::playlist::{Collaborators, FileStore, PlaylistManager};
use downtify_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory where job files are written. Defaults to a `downtify`
    /// directory inside the system temp dir.
    #[clap(long, value_parser = parse_path)]
    pub work_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// URL of the media service that resolves, matches, downloads and tags.
    #[clap(long)]
    pub media_service_url: Option<String>,

    /// Timeout in seconds for media service requests.
    #[clap(long, default_value_t = 300)]
    pub media_service_timeout_sec: u64,

    /// Number of concurrent track workers, clamped to [1, 8].
    #[clap(long)]
    pub workers: Option<usize>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            work_dir: args.work_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            media_service_url: args.media_service_url.clone(),
            media_service_timeout_sec: args.media_service_timeout_sec,
            workers: args.workers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration:");
    info!("  work_dir: {:?}", app_config.work_dir);
    info!("  port: {}", app_config.port);
    info!("  media_service_url: {}", app_config.media_service_url);
    info!(
        "  playlist: {} workers, {}s track timeout, {} output",
        app_config.playlist.workers,
        app_config.playlist.track_timeout.as_secs(),
        app_config.playlist.output_format.as_str()
    );

    metrics::init_metrics();

    let media_service = Arc::new(MediaServiceClient::new(
        app_config.media_service_url.clone(),
        app_config.media_service_timeout_sec,
    )?);
    if let Err(e) = media_service.health_check().await {
        warn!(
            "Media service at {} is not reachable yet: {}",
            app_config.media_service_url, e
        );
    }

    let file_store = Arc::new(FileStore::new(&app_config.work_dir));
    file_store
        .init()
        .await
        .with_context(|| format!("Failed to create work dir {:?}", app_config.work_dir))?;

    let playlist_manager = Arc::new(PlaylistManager::new(
        app_config.playlist.clone(),
        Collaborators::from_service(media_service),
        file_store,
    ));

    let shutdown_token = CancellationToken::new();

    // Spawn background task for job eviction if enabled
    if let Some(retention) = app_config.playlist.job_retention {
        let sweep_interval = app_config.playlist.retention_sweep_interval;
        let sweeping_manager = playlist_manager.clone();
        let sweep_token = shutdown_token.clone();

        info!(
            "Job retention enabled: keeping finished jobs {}s, sweeping every {}s",
            retention.as_secs(),
            sweep_interval.as_secs()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = sweep_token.cancelled() => break,
                    _ = ticker.tick() => {
                        sweeping_manager.evict_expired().await;
                    }
                }
            }
        });
    }

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    let result = tokio::select! {
        result = run_server(server_config, playlist_manager.clone(), shutdown_token.clone()) => {
            if let Err(e) = &result {
                error!("HTTP server stopped: {:?}", e);
            }
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            Ok(())
        }
    };

    shutdown_token.cancel();
    playlist_manager.shutdown().await;

    result
}
