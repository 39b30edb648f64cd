//! Playlist HTTP routes.
//!
//! Provides endpoints for:
//! - Starting a playlist job
//! - Polling job status
//! - Fetching single completed files
//! - Fetching the whole job as a zip archive

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{fs::File, io::BufReader};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::playlist::{naming, PlaylistError};
use crate::server::state::{GuardedPlaylistManager, ServerState};

const STREAM_BUFFER_SIZE: usize = 4096 * 16;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StartPlaylistBody {
    #[serde(alias = "url")]
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartPlaylistResponse {
    pub job_id: String,
}

// =============================================================================
// Error mapping
// =============================================================================

impl IntoResponse for PlaylistError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            PlaylistError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            PlaylistError::PlaylistUnavailable { job_id, .. } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": message, "job_id": job_id })),
            )
                .into_response(),
            PlaylistError::JobNotFound(_) | PlaylistError::FileNotFound { .. } => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            PlaylistError::FileGone(_) => {
                (StatusCode::GONE, Json(json!({ "error": message }))).into_response()
            }
            PlaylistError::Archive(_) | PlaylistError::Io(_) => {
                error!("Playlist request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /start - Resolve a playlist reference and queue its tracks
async fn start_playlist(
    State(manager): State<GuardedPlaylistManager>,
    body: Result<Json<StartPlaylistBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!("Rejected start body: {}", rejection);
            return PlaylistError::InvalidInput(rejection.body_text()).into_response();
        }
    };

    match manager.start(&body.input).await {
        Ok(job_id) => {
            info!("Started playlist job {}", job_id);
            Json(StartPlaylistResponse { job_id }).into_response()
        }
        Err(err) => {
            warn!("Could not start playlist job for {:?}: {}", body.input, err);
            err.into_response()
        }
    }
}

/// GET /status/{job_id} - Current snapshot of a job
async fn get_status(
    State(manager): State<GuardedPlaylistManager>,
    Path(job_id): Path<String>,
) -> Response {
    match manager.snapshot(&job_id) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => err.into_response(),
    }
}

/// GET /file/{job_id}/{file_id} - Stream one completed audio file
async fn get_file(
    State(manager): State<GuardedPlaylistManager>,
    Path((job_id, file_id)): Path<(String, String)>,
) -> Response {
    let completed = match manager.completed_file(&job_id, &file_id).await {
        Ok(completed) => completed,
        Err(err) => return err.into_response(),
    };

    let file = match File::open(&completed.path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return PlaylistError::FileGone(completed.filename).into_response();
        }
        Err(e) => return PlaylistError::Io(e).into_response(),
    };
    let file_length = match file.metadata().await {
        Ok(metadata) => metadata.len(),
        Err(e) => return PlaylistError::Io(e).into_response(),
    };

    let file_reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, file);
    let stream = ReaderStream::with_capacity(file_reader, STREAM_BUFFER_SIZE);

    (
        [
            (
                header::CONTENT_TYPE,
                naming::audio_content_type(&completed.filename).to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                attachment(&completed.filename),
            ),
            (header::CONTENT_LENGTH, file_length.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// GET /download/{job_id} - Zip of every file completed so far
async fn download_archive(
    State(manager): State<GuardedPlaylistManager>,
    Path(job_id): Path<String>,
) -> Response {
    let archive = match manager.build_archive(&job_id).await {
        Ok(archive) => archive,
        Err(err) => return err.into_response(),
    };
    debug!(
        "Serving archive {} for job {} ({} entries)",
        archive.filename, job_id, archive.entries
    );

    let file_reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, File::from_std(archive.file));
    let stream = ReaderStream::with_capacity(file_reader, STREAM_BUFFER_SIZE);

    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&archive.filename)),
            (header::CONTENT_LENGTH, archive.size_bytes.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

// =============================================================================
// Router
// =============================================================================

/// Create the playlist routes router.
///
/// - POST /start
/// - GET /status/{job_id}
/// - GET /file/{job_id}/{file_id}
/// - GET /download/{job_id}
pub fn playlist_routes() -> Router<ServerState> {
    Router::new()
        .route("/start", post(start_playlist))
        .route("/status/{job_id}", get(get_status))
        .route("/file/{job_id}/{file_id}", get(get_file))
        .route("/download/{job_id}", get(download_archive))
}
