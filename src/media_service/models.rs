//! Wire types for the external media service.
//!
//! The service owns playlist metadata lookup, source search, audio
//! extraction and tag embedding. These types match its JSON bodies.

use serde::{Deserialize, Serialize};

use crate::playlist::{OutputFormat, ResolvedPlaylist, SourceMatch};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ResolveRequest<'a> {
    pub input: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DownloadRequest<'a> {
    pub source_id: &'a str,
    pub url: Option<&'a str>,
    pub format: OutputFormat,
}

/// Sent as query parameters, the audio goes in the body.
#[derive(Debug, Serialize)]
pub struct TagQuery<'a> {
    pub extension: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<&'a str>,
}

// =============================================================================
// Responses
// =============================================================================

/// Playlist as returned by `/playlist/resolve`.
pub type ResolveResponse = ResolvedPlaylist;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchResponse {
    pub source_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl From<MatchResponse> for SourceMatch {
    fn from(response: MatchResponse) -> Self {
        SourceMatch {
            source_id: response.source_id,
            url: response.url,
            title: response.title,
        }
    }
}

/// Error body. The service reports errors either as `error` or `detail`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceErrorBody {
    pub error: Option<String>,
    pub detail: Option<String>,
}

impl ServiceErrorBody {
    pub fn message(self) -> Option<String> {
        self.error.or(self.detail).filter(|m| !m.trim().is_empty())
    }
}
