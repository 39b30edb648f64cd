//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When the fake playlists change, update only this file.

// ============================================================================
// Playlist references known to the fake media service
// ============================================================================

/// Four tracks, one of which has no source
pub const MIXED_PLAYLIST_URL: &str = "https://open.spotify.com/playlist/37i9dQZF1DX0000001";

/// Resolves, but has no tracks
pub const EMPTY_PLAYLIST_URL: &str = "https://open.spotify.com/playlist/37i9dQZF1DX0000002";

/// Known to the service but cannot be fetched
pub const PRIVATE_PLAYLIST_URL: &str = "https://open.spotify.com/playlist/37i9dQZF1DX0000003";

/// Not a playlist reference at all
pub const NOT_A_PLAYLIST: &str = "https://example.com/some/page";

// ============================================================================
// Mixed playlist contents
// ============================================================================

pub const MIXED_PLAYLIST_TITLE: &str = "Summer: Hits";
pub const MIXED_PLAYLIST_ARCHIVE: &str = "Summer Hits.zip";
pub const MIXED_PLAYLIST_ARTIST: &str = "The Mornings";
pub const MIXED_PLAYLIST_TRACK_COUNT: usize = 4;

pub const TRACK_1_TITLE: &str = "Sunrise";
pub const TRACK_2_TITLE: &str = "Lost Song";
pub const TRACK_3_TITLE: &str = "Tide";
pub const TRACK_4_TITLE: &str = "Dusk";

/// The track of the mixed playlist that the matcher never finds
pub const UNMATCHED_TRACK_TITLE: &str = TRACK_2_TITLE;

/// Stored file names of the tracks that complete
pub const TRACK_1_FILENAME: &str = "001 - The Mornings - Sunrise.mp3";
pub const TRACK_3_FILENAME: &str = "003 - The Mornings - Tide.mp3";
pub const TRACK_4_FILENAME: &str = "004 - The Mornings - Dusk.mp3";

/// Unavailability reason reported for the private playlist
pub const PRIVATE_PLAYLIST_REASON: &str = "Playlist is private";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for a job to reach a terminal status (milliseconds)
pub const JOB_DONE_TIMEOUT_MS: u64 = 10_000;

/// Polling interval when waiting for a job (milliseconds)
pub const JOB_POLL_INTERVAL_MS: u64 = 25;

/// Worker pool size used by test servers
pub const TEST_WORKERS: usize = 2;
