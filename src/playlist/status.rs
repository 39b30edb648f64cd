//! Read-only projections of jobs for polling clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::PlaylistError;
use super::models::{CompletedFile, Job, JobStatus, OutputFormat, TrackStatus, TrackTask};
use super::registry::JobRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub index: usize,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<u32>,
    pub status: TrackStatus,
    pub error: Option<String>,
    pub file_id: Option<String>,
}

impl From<&TrackTask> for TrackSnapshot {
    fn from(task: &TrackTask) -> Self {
        Self {
            index: task.index,
            title: task.meta.title.clone(),
            artist: task.meta.artist.clone(),
            album: task.meta.album.clone(),
            duration_secs: task.meta.duration_secs,
            status: task.status,
            error: task.attempt_error.clone(),
            file_id: task.result_file_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub id: String,
    pub index: usize,
    pub title: String,
    pub artist: Option<String>,
    pub filename: String,
    pub size_bytes: u64,
}

impl From<&CompletedFile> for FileSnapshot {
    fn from(file: &CompletedFile) -> Self {
        Self {
            id: file.id.clone(),
            index: file.track_index,
            title: file.title.clone(),
            artist: file.artist.clone(),
            filename: file.filename.clone(),
            size_bytes: file.size_bytes,
        }
    }
}

/// Polling view of a job. `files` is in completion order, `tracks` in
/// playlist order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub playlist_title: Option<String>,
    pub cover_url: Option<String>,
    pub output_format: OutputFormat,
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    pub error: Option<String>,
    pub tracks: Vec<TrackSnapshot>,
    pub files: Vec<FileSnapshot>,
    pub ready: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            playlist_title: job.playlist_title.clone(),
            cover_url: job.cover_url.clone(),
            output_format: job.output_format,
            total: job.total(),
            done: job.done_count,
            failed: job.failed_count,
            error: job.error.clone(),
            tracks: job.tracks.iter().map(TrackSnapshot::from).collect(),
            files: job.files.iter().map(FileSnapshot::from).collect(),
            ready: job.is_ready(),
            created_at: job.created_at,
        }
    }
}

pub struct StatusReporter {
    registry: Arc<JobRegistry>,
}

impl StatusReporter {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }

    pub fn snapshot(&self, job_id: &str) -> Result<JobSnapshot, PlaylistError> {
        let job = self.registry.get(job_id)?;
        Ok(JobSnapshot::from(&job))
    }
}
