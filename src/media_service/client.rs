//! HTTP client for the external media service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::models::{
    DownloadRequest, MatchResponse, ResolveRequest, ResolveResponse, ServiceErrorBody, TagQuery,
};
use crate::playlist::{
    AudioData, AudioDownloader, DownloadError, MatchError, OutputFormat, PlaylistResolver,
    ResolveError, ResolvedPlaylist, SourceMatch, SourceMatcher, TagError, Tagger,
    TrackDescriptor,
};

/// Response header carrying the audio file extension.
pub const AUDIO_EXTENSION_HEADER: &str = "x-audio-extension";

/// HTTP client implementing every playlist collaborator against the media service.
pub struct MediaServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl MediaServiceClient {
    /// Create a new media service client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the media service (e.g., "http://localhost:8800")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Check if the media service is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to media service")?;

        if response.status().is_success() {
            Ok(())
        } else {
            anyhow::bail!(
                "Media service health check failed with status: {}",
                response.status()
            )
        }
    }

    /// Get the base URL of the media service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Best effort error message of a failed response.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ServiceErrorBody>(&text)
        .ok()
        .and_then(ServiceErrorBody::message)
        .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| format!("status {}", status))
}

/// Extension of the returned audio, from the explicit header or the content type.
fn audio_extension(headers: &HeaderMap, format: OutputFormat) -> String {
    let explicit = headers
        .get(AUDIO_EXTENSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().trim_start_matches('.').to_lowercase())
        .filter(|v| !v.is_empty());
    if let Some(ext) = explicit {
        return ext;
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_lowercase());
    let from_content_type = match content_type.as_deref() {
        Some("audio/mpeg") | Some("audio/mp3") => Some("mp3"),
        Some("audio/mp4") | Some("audio/x-m4a") | Some("audio/aac") => Some("m4a"),
        Some("audio/ogg") | Some("audio/opus") => Some("opus"),
        Some("audio/webm") => Some("webm"),
        _ => None,
    };

    from_content_type
        .unwrap_or(match format {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
            OutputFormat::Opus => "opus",
            OutputFormat::Best => "webm",
        })
        .to_string()
}

#[async_trait]
impl PlaylistResolver for MediaServiceClient {
    async fn resolve(&self, input: &str) -> Result<ResolvedPlaylist, ResolveError> {
        let url = format!("{}/playlist/resolve", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ResolveRequest { input })
            .send()
            .await
            .map_err(|e| ResolveError::Unavailable(format!("Media service unreachable: {}", e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<ResolveResponse>()
                .await
                .map_err(|e| ResolveError::Unavailable(format!("Invalid playlist response: {}", e))),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ResolveError::InvalidInput(error_message(response).await))
            }
            _ => Err(ResolveError::Unavailable(error_message(response).await)),
        }
    }
}

#[async_trait]
impl SourceMatcher for MediaServiceClient {
    async fn find_source(&self, track: &TrackDescriptor) -> Result<SourceMatch, MatchError> {
        let url = format!("{}/match", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(track)
            .send()
            .await
            .map_err(|e| MatchError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let found: MatchResponse = response
                    .json()
                    .await
                    .map_err(|e| MatchError::Transport(format!("Invalid match response: {}", e)))?;
                debug!("Matched \"{}\" to {}", track.search_query(), found.source_id);
                Ok(found.into())
            }
            StatusCode::NOT_FOUND => Err(MatchError::NoMatch(track.search_query())),
            _ => Err(MatchError::Transport(error_message(response).await)),
        }
    }
}

#[async_trait]
impl AudioDownloader for MediaServiceClient {
    async fn download(
        &self,
        source: &SourceMatch,
        format: OutputFormat,
    ) -> Result<AudioData, DownloadError> {
        let url = format!("{}/download", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&DownloadRequest {
                source_id: &source.source_id,
                url: source.url.as_deref(),
                format,
            })
            .send()
            .await
            .map_err(|e| DownloadError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DownloadError(error_message(response).await));
        }

        let extension = audio_extension(response.headers(), format);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadError(format!("Failed to read audio: {}", e)))?;
        if bytes.is_empty() {
            return Err(DownloadError("Empty audio response".to_string()));
        }

        Ok(AudioData {
            bytes: bytes.to_vec(),
            extension,
        })
    }
}

#[async_trait]
impl Tagger for MediaServiceClient {
    async fn tag(&self, audio: AudioData, track: &TrackDescriptor) -> Result<AudioData, TagError> {
        let url = format!("{}/tag", self.base_url);
        let query = TagQuery {
            extension: &audio.extension,
            title: &track.title,
            artist: track.artist.as_deref(),
            album: track.album.as_deref(),
            cover_url: track.cover_url.as_deref(),
        };
        let response = self
            .client
            .post(&url)
            .query(&query)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(audio.bytes)
            .send()
            .await
            .map_err(|e| TagError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TagError(error_message(response).await));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TagError(format!("Failed to read tagged audio: {}", e)))?;

        Ok(AudioData {
            bytes: bytes.to_vec(),
            extension: audio.extension,
        })
    }
}
