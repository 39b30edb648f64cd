mod file_config;

pub use file_config::{FileConfig, PlaylistConfig};

use crate::playlist::{clamp_workers, OutputFormat, DEFAULT_WORKERS};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub work_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub media_service_url: Option<String>,
    pub media_service_timeout_sec: u64,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub work_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub media_service_url: String,
    pub media_service_timeout_sec: u64,

    // Feature configs (with defaults)
    pub playlist: PlaylistSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let media_service_url = file
            .media_service_url
            .or_else(|| cli.media_service_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "media_service_url must be specified via --media-service-url or in config file"
                )
            })?;
        if !media_service_url.starts_with("http://") && !media_service_url.starts_with("https://")
        {
            bail!("media_service_url must be an http(s) URL: {}", media_service_url);
        }

        let work_dir = file
            .work_dir
            .map(PathBuf::from)
            .or_else(|| cli.work_dir.clone())
            .unwrap_or_else(|| std::env::temp_dir().join("downtify"));
        if work_dir.exists() && !work_dir.is_dir() {
            bail!("work_dir is not a directory: {:?}", work_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let media_service_timeout_sec = file
            .media_service_timeout_sec
            .unwrap_or(cli.media_service_timeout_sec);

        // Playlist settings - merge file config with defaults
        let pl_file = file.playlist.unwrap_or_default();
        let defaults = PlaylistSettings::default();
        let output_format = match pl_file.output_format {
            Some(s) => match s.parse::<OutputFormat>() {
                Ok(format) => format,
                Err(e) => bail!("Invalid output_format: {}", e),
            },
            None => defaults.output_format,
        };
        let playlist = PlaylistSettings {
            workers: clamp_workers(
                pl_file
                    .workers
                    .or(cli.workers)
                    .unwrap_or(defaults.workers),
            ),
            track_timeout: pl_file
                .track_timeout_sec
                .map(Duration::from_secs)
                .unwrap_or(defaults.track_timeout),
            output_format,
            job_retention: match pl_file.job_retention_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.job_retention,
            },
            retention_sweep_interval: pl_file
                .retention_sweep_interval_secs
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or(defaults.retention_sweep_interval),
        };

        Ok(Self {
            work_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            media_service_url,
            media_service_timeout_sec,
            playlist,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSettings {
    /// Worker pool size, always within `[1, 8]`.
    pub workers: usize,
    /// Upper bound on a single track's download.
    pub track_timeout: Duration,
    pub output_format: OutputFormat,
    /// How long finished jobs are kept. None keeps them forever.
    pub job_retention: Option<Duration>,
    pub retention_sweep_interval: Duration,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            track_timeout: Duration::from_secs(600),
            output_format: OutputFormat::Mp3,
            job_retention: Some(Duration::from_secs(6 * 60 * 60)),
            retention_sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
