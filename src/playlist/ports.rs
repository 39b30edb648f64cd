//! Interfaces to the external collaborators the pipeline drives.
//!
//! Metadata resolution, source matching, audio transfer and tagging all live
//! outside this crate. The pipeline only sees these traits.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::models::{OutputFormat, ResolvedPlaylist, TrackDescriptor};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The reference is not something the resolver understands. No job is created.
    #[error("Invalid playlist reference: {0}")]
    InvalidInput(String),

    /// The playlist could not be fetched or has no tracks.
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("No match found for \"{0}\"")]
    NoMatch(String),

    #[error("Source search failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct DownloadError(pub String);

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TagError(pub String);

/// A downloadable source chosen for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMatch {
    pub source_id: String,
    pub url: Option<String>,
    pub title: Option<String>,
}

/// Encoded audio plus the extension matching its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    pub bytes: Vec<u8>,
    /// Without the leading dot, e.g. "mp3".
    pub extension: String,
}

/// Turns a playlist reference into an ordered track list.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    async fn resolve(&self, input: &str) -> Result<ResolvedPlaylist, ResolveError>;
}

/// Finds a downloadable source for a track.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait SourceMatcher: Send + Sync {
    async fn find_source(&self, track: &TrackDescriptor) -> Result<SourceMatch, MatchError>;
}

/// Fetches and transcodes the audio of a source.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    async fn download(
        &self,
        source: &SourceMatch,
        format: OutputFormat,
    ) -> Result<AudioData, DownloadError>;
}

/// Embeds title/artist/album/cover metadata into encoded audio.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Tagger: Send + Sync {
    async fn tag(&self, audio: AudioData, track: &TrackDescriptor) -> Result<AudioData, TagError>;
}

/// The full set of collaborators needed to run playlist jobs.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn PlaylistResolver>,
    pub matcher: Arc<dyn SourceMatcher>,
    pub downloader: Arc<dyn AudioDownloader>,
    pub tagger: Arc<dyn Tagger>,
}

impl Collaborators {
    /// Use one service for every role.
    pub fn from_service<S>(service: Arc<S>) -> Self
    where
        S: PlaylistResolver + SourceMatcher + AudioDownloader + Tagger + 'static,
    {
        Self {
            resolver: service.clone(),
            matcher: service.clone(),
            downloader: service.clone(),
            tagger: service,
        }
    }
}
