//! In-process collaborators for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use super::models::{OutputFormat, ResolvedPlaylist, TrackDescriptor};
use super::ports::{
    AudioData, AudioDownloader, Collaborators, DownloadError, MatchError, PlaylistResolver,
    ResolveError, SourceMatch, SourceMatcher, TagError, Tagger,
};

pub fn playlist(title: &str, n: usize) -> ResolvedPlaylist {
    ResolvedPlaylist {
        title: title.to_string(),
        cover_url: None,
        tracks: (1..=n).map(track).collect(),
    }
}

pub fn track(i: usize) -> TrackDescriptor {
    TrackDescriptor {
        title: format!("Track {}", i),
        artist: Some("Artist".to_string()),
        album: Some("Album".to_string()),
        duration_secs: Some(180),
        source_id: Some(format!("src-{}", i)),
        cover_url: None,
    }
}

enum Resolution {
    Ok(ResolvedPlaylist),
    Unavailable(String),
}

/// Scripted media service. Every track succeeds unless told otherwise.
#[derive(Default)]
pub struct FakeMediaService {
    playlists: Mutex<HashMap<String, Resolution>>,
    no_match: Mutex<HashSet<String>>,
    broken_downloads: Mutex<HashSet<String>>,
    hanging_matches: Mutex<HashSet<String>>,
    hanging_downloads: Mutex<HashSet<String>>,
    hanging_tags: Mutex<HashSet<String>>,
    broken_tags: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    download_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    downloads: AtomicUsize,
}

impl FakeMediaService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators::from_service(self.clone())
    }

    pub fn with_playlist(&self, input: &str, playlist: ResolvedPlaylist) {
        self.playlists
            .lock()
            .insert(input.to_string(), Resolution::Ok(playlist));
    }

    pub fn with_unavailable(&self, input: &str, message: &str) {
        self.playlists
            .lock()
            .insert(input.to_string(), Resolution::Unavailable(message.to_string()));
    }

    pub fn with_no_match(&self, title: &str) {
        self.no_match.lock().insert(title.to_string());
    }

    pub fn with_broken_download(&self, title: &str) {
        self.broken_downloads.lock().insert(title.to_string());
    }

    pub fn with_hanging_match(&self, title: &str) {
        self.hanging_matches.lock().insert(title.to_string());
    }

    pub fn with_hanging_tag(&self, title: &str) {
        self.hanging_tags.lock().insert(title.to_string());
    }

    pub fn with_hanging_download(&self, title: &str) {
        self.hanging_downloads.lock().insert(title.to_string());
    }

    pub fn with_broken_tag(&self, title: &str) {
        self.broken_tags.lock().insert(title.to_string());
    }

    pub fn with_download_delay(&self, delay: Duration) {
        *self.download_delay.lock() = delay;
    }

    /// Hold the download of `title` until [`FakeMediaService::release`] is called.
    pub fn gate(&self, title: &str) {
        self.gates
            .lock()
            .insert(title.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, title: &str) {
        if let Some(gate) = self.gates.lock().get(title) {
            gate.add_permits(1);
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlaylistResolver for FakeMediaService {
    async fn resolve(&self, input: &str) -> Result<ResolvedPlaylist, ResolveError> {
        match self.playlists.lock().get(input) {
            Some(Resolution::Ok(playlist)) => Ok(playlist.clone()),
            Some(Resolution::Unavailable(message)) => Err(ResolveError::Unavailable(message.clone())),
            None => Err(ResolveError::InvalidInput(input.to_string())),
        }
    }
}

#[async_trait]
impl SourceMatcher for FakeMediaService {
    async fn find_source(&self, track: &TrackDescriptor) -> Result<SourceMatch, MatchError> {
        if self.hanging_matches.lock().contains(&track.title) {
            std::future::pending::<()>().await;
        }
        if self.no_match.lock().contains(&track.title) {
            return Err(MatchError::NoMatch(track.search_query()));
        }
        Ok(SourceMatch {
            source_id: format!("video-{}", track.title),
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
        let title = source.title.clone().unwrap_or_default();
        self.enter();
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().get(&title).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let delay = *self.download_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.hanging_downloads.lock().contains(&title) {
            // Outlives any timeout used in tests. The counter stays raised
            // since a timed out future is dropped here.
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        self.leave();
        if self.broken_downloads.lock().contains(&title) {
            return Err(DownloadError("extractor error".to_string()));
        }

        let extension = match format {
            OutputFormat::Best | OutputFormat::Opus => "opus",
            OutputFormat::M4a => "m4a",
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
    async fn tag(&self, audio: AudioData, track: &TrackDescriptor) -> Result<AudioData, TagError> {
        if self.hanging_tags.lock().contains(&track.title) {
            std::future::pending::<()>().await;
        }
        if self.broken_tags.lock().contains(&track.title) {
            return Err(TagError("unsupported container".to_string()));
        }
        let mut bytes = audio.bytes;
        bytes.extend_from_slice(b"|tagged");
        Ok(AudioData {
            bytes,
            extension: audio.extension,
        })
    }
}
