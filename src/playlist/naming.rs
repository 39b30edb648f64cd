//! File naming and content type helpers.

use lazy_static::lazy_static;
use regex::Regex;

use super::models::TrackDescriptor;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex =
        Regex::new(r"[^a-zA-Z0-9 _\-\.]+").expect("valid filename regex");
}

/// Strip everything outside `[A-Za-z0-9 _-.]`, falling back to `fallback`.
pub fn sanitize(value: &str, fallback: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(value, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

/// "Artist - Title", sanitized.
pub fn track_stem(track: &TrackDescriptor) -> String {
    let base = match &track.artist {
        Some(artist) if !artist.trim().is_empty() => format!("{} - {}", artist, track.title),
        _ => track.title.clone(),
    };
    sanitize(&base, "download")
}

/// Name of a stored track, e.g. "003 - Artist - Title.mp3".
///
/// The zero-padded index keeps files in playlist order when sorted by name.
pub fn track_filename(index: usize, track: &TrackDescriptor, extension: &str) -> String {
    let ext = extension.trim_start_matches('.');
    let ext = if ext.is_empty() { "bin" } else { ext };
    format!("{:03} - {}.{}", index, track_stem(track), ext.to_lowercase())
}

/// Name of the zip archive for a playlist.
pub fn archive_filename(playlist_title: Option<&str>) -> String {
    format!("{}.zip", sanitize(playlist_title.unwrap_or(""), "playlist"))
}

/// MIME type for a stored audio file, by extension.
pub fn audio_content_type(filename: &str) -> &'static str {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("opus") | Some("webm") | Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}
