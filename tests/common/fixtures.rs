//! Fake media service for end-to-end tests
//!
//! Implements the collaborator traits in process, so tests exercise the real
//! router, worker pool and archive code without any network dependency.

use super::constants::*;
use async_trait::async_trait;
use downtify_server::playlist::{
    AudioData, AudioDownloader, Collaborators, DownloadError, MatchError, OutputFormat,
    PlaylistResolver, ResolveError, ResolvedPlaylist, SourceMatch, SourceMatcher, TagError,
    Tagger, TrackDescriptor,
};
use std::sync::Arc;

pub struct FakeMediaService;

fn mixed_playlist() -> ResolvedPlaylist {
    let tracks = [TRACK_1_TITLE, TRACK_2_TITLE, TRACK_3_TITLE, TRACK_4_TITLE]
        .iter()
        .enumerate()
        .map(|(i, title)| TrackDescriptor {
            album: Some("Seasons".to_string()),
            duration_secs: Some(200 + i as u32),
            source_id: Some(format!("sp-{}", i + 1)),
            ..TrackDescriptor::new(*title, Some(MIXED_PLAYLIST_ARTIST))
        })
        .collect();

    ResolvedPlaylist {
        title: MIXED_PLAYLIST_TITLE.to_string(),
        cover_url: Some("https://i.scdn.co/image/cover".to_string()),
        tracks,
    }
}

/// Content the fake downloader and tagger produce for a track.
pub fn expected_audio(title: &str) -> Vec<u8> {
    format!("audio:{}|tagged", title).into_bytes()
}

pub fn fake_collaborators() -> Collaborators {
    Collaborators::from_service(Arc::new(FakeMediaService))
}

#[async_trait]
impl PlaylistResolver for FakeMediaService {
    async fn resolve(&self, input: &str) -> Result<ResolvedPlaylist, ResolveError> {
        match input {
            MIXED_PLAYLIST_URL => Ok(mixed_playlist()),
            EMPTY_PLAYLIST_URL => Ok(ResolvedPlaylist {
                title: "Nothing Here".to_string(),
                cover_url: None,
                tracks: Vec::new(),
            }),
            PRIVATE_PLAYLIST_URL => Err(ResolveError::Unavailable(
                PRIVATE_PLAYLIST_REASON.to_string(),
            )),
            other => Err(ResolveError::InvalidInput(format!(
                "Not a playlist: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl SourceMatcher for FakeMediaService {
    async fn find_source(&self, track: &TrackDescriptor) -> Result<SourceMatch, MatchError> {
        if track.title == UNMATCHED_TRACK_TITLE {
            return Err(MatchError::NoMatch(track.search_query()));
        }
        Ok(SourceMatch {
            source_id: format!("yt-{}", track.title.to_lowercase()),
            url: None,
            title: Some(track.title.clone()),
        })
    }
}

#[async_trait]
impl AudioDownloader for FakeMediaService {
    async fn download(
        &self,
        source: &SourceMatch,
        format: OutputFormat,
    ) -> Result<AudioData, DownloadError> {
        let title = source
            .title
            .clone()
            .ok_or_else(|| DownloadError("source has no title".to_string()))?;
        let extension = match format {
            OutputFormat::M4a => "m4a",
            OutputFormat::Best | OutputFormat::Opus => "opus",
            OutputFormat::Mp3 => "mp3",
        };
        Ok(AudioData {
            bytes: format!("audio:{}", title).into_bytes(),
            extension: extension.to_string(),
        })
    }
}

#[async_trait]
impl Tagger for FakeMediaService {
    async fn tag(&self, audio: AudioData, _track: &TrackDescriptor) -> Result<AudioData, TagError> {
        let mut bytes = audio.bytes;
        bytes.extend_from_slice(b"|tagged");
        Ok(AudioData {
            bytes,
            extension: audio.extension,
        })
    }
}
