//! Data models for playlist jobs.
//!
//! Defines jobs, per-track tasks, completed files and the state machines
//! that drive them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

pub type JobId = String;

/// Status of a playlist job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,   // terminal
    Failed, // terminal
}

impl JobStatus {
    /// Returns true if this is a terminal state (Done or Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

/// Status of a single track inside a job.
///
/// `Pending -> Resolving -> Downloading -> {Done | Failed}`. A track may also
/// fail straight from `Resolving` when no source matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Pending,
    Resolving,
    Downloading,
    Done,   // terminal
    Failed, // terminal
}

impl TrackStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackStatus::Done | TrackStatus::Failed)
    }

    /// True while a worker holds the track.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TrackStatus::Resolving | TrackStatus::Downloading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Pending => "pending",
            TrackStatus::Resolving => "resolving",
            TrackStatus::Downloading => "downloading",
            TrackStatus::Done => "done",
            TrackStatus::Failed => "failed",
        }
    }
}

/// Audio format requested from the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Best,
    #[default]
    Mp3,
    M4a,
    Opus,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Best => "best",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
            OutputFormat::Opus => "opus",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output format: {0}")]
pub struct ParseOutputFormatError(pub String);

impl FromStr for OutputFormat {
    type Err = ParseOutputFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best" => Ok(OutputFormat::Best),
            "mp3" => Ok(OutputFormat::Mp3),
            "m4a" => Ok(OutputFormat::M4a),
            "opus" => Ok(OutputFormat::Opus),
            _ => Err(ParseOutputFormatError(s.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Track metadata as known when the playlist was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    /// Identifier of the track in the playlist's source service.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl TrackDescriptor {
    pub fn new(title: impl Into<String>, artist: Option<&str>) -> Self {
        Self {
            title: title.into(),
            artist: artist.map(str::to_string),
            ..Default::default()
        }
    }

    /// Free-text query used to look the track up on a source.
    pub fn search_query(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} {}", self.title, artist),
            None => self.title.clone(),
        }
    }
}

/// Output of the playlist resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlaylist {
    pub title: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub tracks: Vec<TrackDescriptor>,
}

/// One track of a job. Created with the job, never added or removed.
#[derive(Debug, Clone)]
pub struct TrackTask {
    /// 1-based playlist position.
    pub index: usize,
    pub meta: TrackDescriptor,
    pub status: TrackStatus,
    pub attempt_error: Option<String>,
    pub result_file_id: Option<String>,
}

/// A downloadable audio file produced by a finished track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFile {
    /// Unique within the job (the track index in decimal).
    pub id: String,
    pub track_index: usize,
    pub path: PathBuf,
    pub filename: String,
    pub title: String,
    pub artist: Option<String>,
    pub size_bytes: u64,
}

/// A playlist job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub input: String,
    pub status: JobStatus,
    pub playlist_title: Option<String>,
    pub cover_url: Option<String>,
    pub output_format: OutputFormat,
    pub tracks: Vec<TrackTask>,
    /// Completion order, not track order.
    pub files: Vec<CompletedFile>,
    pub error: Option<String>,
    pub done_count: usize,
    pub failed_count: usize,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new_id() -> JobId {
        uuid::Uuid::new_v4().to_string()
    }

    /// Job for a playlist that resolved successfully. All tracks start pending.
    pub fn resolved(
        id: JobId,
        input: &str,
        output_format: OutputFormat,
        playlist: ResolvedPlaylist,
    ) -> Self {
        let tracks = playlist
            .tracks
            .into_iter()
            .enumerate()
            .map(|(i, meta)| TrackTask {
                index: i + 1,
                meta,
                status: TrackStatus::Pending,
                attempt_error: None,
                result_file_id: None,
            })
            .collect();

        let mut job = Self {
            id,
            input: input.to_string(),
            status: JobStatus::Pending,
            playlist_title: Some(playlist.title),
            cover_url: playlist.cover_url,
            output_format,
            tracks,
            files: Vec::new(),
            error: None,
            done_count: 0,
            failed_count: 0,
            created_at: Utc::now(),
            finished_at: None,
        };
        // An empty playlist has nothing to drain.
        job.finish_if_drained();
        job
    }

    /// Job whose playlist could not be resolved. Has no tracks.
    pub fn unavailable(
        id: JobId,
        input: &str,
        output_format: OutputFormat,
        error: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            input: input.to_string(),
            status: JobStatus::Failed,
            playlist_title: None,
            cover_url: None,
            output_format,
            tracks: Vec::new(),
            files: Vec::new(),
            error: Some(error.into()),
            done_count: 0,
            failed_count: 0,
            created_at: now,
            finished_at: Some(now),
        }
    }

    pub fn total(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_drained(&self) -> bool {
        self.done_count + self.failed_count == self.tracks.len()
    }

    /// True once at least one file can be downloaded.
    pub fn is_ready(&self) -> bool {
        self.done_count >= 1
    }

    pub fn track(&self, index: usize) -> Option<&TrackTask> {
        index.checked_sub(1).and_then(|i| self.tracks.get(i))
    }

    fn track_mut(&mut self, index: usize) -> Option<&mut TrackTask> {
        index.checked_sub(1).and_then(|i| self.tracks.get_mut(i))
    }

    pub fn file(&self, file_id: &str) -> Option<&CompletedFile> {
        self.files.iter().find(|f| f.id == file_id)
    }

    /// Number of tracks currently held by a worker.
    pub fn in_flight_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.status.is_in_flight())
            .count()
    }

    /// Claim a pending track for processing.
    ///
    /// Moves the track to `Resolving` and the job to `Running`. Returns the
    /// track metadata, or None if the track does not exist or was already
    /// claimed.
    pub fn claim_track(&mut self, index: usize) -> Option<TrackDescriptor> {
        if self.status.is_terminal() {
            return None;
        }
        let track = self.track_mut(index)?;
        if track.status != TrackStatus::Pending {
            return None;
        }
        track.status = TrackStatus::Resolving;
        let meta = track.meta.clone();
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
        }
        Some(meta)
    }

    /// `Resolving -> Downloading`. Returns false if the track was not resolving.
    pub fn mark_downloading(&mut self, index: usize) -> bool {
        match self.track_mut(index) {
            Some(track) if track.status == TrackStatus::Resolving => {
                track.status = TrackStatus::Downloading;
                true
            }
            _ => false,
        }
    }

    /// Record a successfully produced file for a track.
    ///
    /// Appends the file, bumps `done_count` and finishes the job if this was
    /// the last outstanding track. Returns false (and changes nothing) if the
    /// track is unknown or already terminal.
    pub fn complete_track(&mut self, index: usize, file: CompletedFile) -> bool {
        let Some(track) = self.track_mut(index) else {
            return false;
        };
        if track.status.is_terminal() {
            return false;
        }
        track.status = TrackStatus::Done;
        track.attempt_error = None;
        track.result_file_id = Some(file.id.clone());
        self.files.push(file);
        self.done_count += 1;
        self.finish_if_drained();
        true
    }

    /// Record a track failure. Same contract as [`Job::complete_track`].
    pub fn fail_track(&mut self, index: usize, error: impl Into<String>) -> bool {
        let Some(track) = self.track_mut(index) else {
            return false;
        };
        if track.status.is_terminal() {
            return false;
        }
        track.status = TrackStatus::Failed;
        track.attempt_error = Some(error.into());
        self.failed_count += 1;
        self.finish_if_drained();
        true
    }

    /// Move the job to `Done` once every track is terminal, regardless of
    /// how many failed. Returns true on the transition.
    fn finish_if_drained(&mut self) -> bool {
        if self.status.is_terminal() || !self.is_drained() {
            return false;
        }
        self.status = JobStatus::Done;
        self.finished_at = Some(Utc::now());
        true
    }
}
