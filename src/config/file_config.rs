use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub work_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub media_service_url: Option<String>,
    pub media_service_timeout_sec: Option<u64>,

    // Feature configs
    pub playlist: Option<PlaylistConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PlaylistConfig {
    pub workers: Option<usize>,
    pub track_timeout_sec: Option<u64>,
    /// One of "best", "mp3", "m4a", "opus"
    pub output_format: Option<String>,
    /// 0 keeps finished jobs forever
    pub job_retention_secs: Option<u64>,
    pub retention_sweep_interval_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
