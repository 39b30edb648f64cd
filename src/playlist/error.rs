//! Error types for the playlist pipeline.

use std::time::Duration;
use thiserror::Error;

/// Request and job level errors. These are the only errors that reach callers.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Playlist unavailable: {message}")]
    PlaylistUnavailable { job_id: String, message: String },

    #[error("Playlist job not found: {0}")]
    JobNotFound(String),

    #[error("Track file {file_id} not found in job {job_id}")]
    FileNotFound { job_id: String, file_id: String },

    #[error("Track file is no longer available: {0}")]
    FileGone(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Track level errors. Recorded on the track, never propagated past the
/// worker that produced them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("No match found: {0}")]
    NoMatchFound(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Download failed: timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Tagging failed: {0}")]
    TaggingFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TrackError {
    /// Stable label used for logs and metrics. Timeouts count as download failures.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackError::NoMatchFound(_) => "no_match_found",
            TrackError::DownloadFailed(_) | TrackError::Timeout(_) => "download_failed",
            TrackError::TaggingFailed(_) => "tagging_failed",
            TrackError::Storage(_) => "storage",
        }
    }
}
