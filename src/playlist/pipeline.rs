//! Per-track processing: match, download, tag, store.
//!
//! Every state change goes through [`JobRegistry::mutate`]. Track failures
//! are recorded on the track and never escape [`TrackPipeline::run`].

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::error::TrackError;
use super::file_store::FileStore;
use super::models::{CompletedFile, JobId, OutputFormat, TrackDescriptor};
use super::naming;
use super::ports::{Collaborators, MatchError};
use super::registry::JobRegistry;
use crate::server::metrics;

/// One queued unit of work: a single track of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackWork {
    pub job_id: JobId,
    pub index: usize,
}

/// What happened to a [`TrackWork`] item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Done { file_id: String },
    Failed(TrackError),
    /// The track was not pending (already claimed) or the job is gone.
    Skipped,
}

pub struct TrackPipeline {
    registry: Arc<JobRegistry>,
    collaborators: Collaborators,
    file_store: Arc<FileStore>,
    track_timeout: Duration,
}

impl TrackPipeline {
    pub fn new(
        registry: Arc<JobRegistry>,
        collaborators: Collaborators,
        file_store: Arc<FileStore>,
        track_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            collaborators,
            file_store,
            track_timeout,
        }
    }

    /// Drive one track to a terminal state.
    pub async fn run(&self, work: &TrackWork) -> TrackOutcome {
        let claimed = self.registry.mutate(&work.job_id, |job| {
            job.claim_track(work.index)
                .map(|meta| (meta, job.output_format))
        });

        let (meta, format) = match claimed {
            Ok(Some(claimed)) => claimed,
            Ok(None) => {
                debug!(
                    "Track {} of job {} is not pending, skipping",
                    work.index, work.job_id
                );
                return TrackOutcome::Skipped;
            }
            Err(e) => {
                debug!("Skipping track {}: {}", work.index, e);
                return TrackOutcome::Skipped;
            }
        };

        let started = Instant::now();
        let result = self.process(work, &meta, format).await;
        let outcome = self.record(work, result);

        match &outcome {
            TrackOutcome::Done { .. } => metrics::record_playlist_track("done", started.elapsed()),
            TrackOutcome::Failed(_) => metrics::record_playlist_track("failed", started.elapsed()),
            TrackOutcome::Skipped => {}
        }
        outcome
    }

    async fn process(
        &self,
        work: &TrackWork,
        meta: &TrackDescriptor,
        format: OutputFormat,
    ) -> Result<CompletedFile, TrackError> {
        debug!(
            "Job {} track {}: looking up source for \"{}\"",
            work.job_id,
            work.index,
            meta.search_query()
        );
        let lookup = self.collaborators.matcher.find_source(meta);
        let source = match tokio::time::timeout(self.track_timeout, lookup).await {
            Ok(Ok(source)) => source,
            Ok(Err(MatchError::NoMatch(query))) => return Err(TrackError::NoMatchFound(query)),
            Ok(Err(MatchError::Transport(message))) => {
                return Err(TrackError::NoMatchFound(message))
            }
            Err(_) => {
                return Err(TrackError::NoMatchFound(format!(
                    "lookup timed out after {}s",
                    self.track_timeout.as_secs()
                )))
            }
        };

        self.registry
            .mutate(&work.job_id, |job| job.mark_downloading(work.index))
            .map_err(|e| TrackError::Storage(e.to_string()))?;

        debug!(
            "Job {} track {}: downloading source {} as {}",
            work.job_id, work.index, source.source_id, format
        );
        let download = self.collaborators.downloader.download(&source, format);
        let audio = match tokio::time::timeout(self.track_timeout, download).await {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => return Err(TrackError::DownloadFailed(e.0)),
            Err(_) => return Err(TrackError::Timeout(self.track_timeout)),
        };

        let tagging = self.collaborators.tagger.tag(audio, meta);
        let audio = match tokio::time::timeout(self.track_timeout, tagging).await {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => return Err(TrackError::TaggingFailed(e.0)),
            Err(_) => {
                return Err(TrackError::TaggingFailed(format!(
                    "timed out after {}s",
                    self.track_timeout.as_secs()
                )))
            }
        };

        let filename = naming::track_filename(work.index, meta, &audio.extension);
        let (path, size_bytes) = self
            .file_store
            .save_track(&work.job_id, &filename, &audio.bytes)
            .await
            .map_err(|e| TrackError::Storage(e.to_string()))?;

        Ok(CompletedFile {
            id: work.index.to_string(),
            track_index: work.index,
            path,
            filename,
            title: meta.title.clone(),
            artist: meta.artist.clone(),
            size_bytes,
        })
    }

    /// Commit the terminal state, the counters and the done-check together.
    fn record(&self, work: &TrackWork, result: Result<CompletedFile, TrackError>) -> TrackOutcome {
        let committed = self.registry.mutate(&work.job_id, |job| {
            let was_terminal = job.status.is_terminal();
            let outcome = match result {
                Ok(file) => {
                    let file_id = file.id.clone();
                    job.complete_track(work.index, file);
                    TrackOutcome::Done { file_id }
                }
                Err(err) => {
                    job.fail_track(work.index, err.to_string());
                    TrackOutcome::Failed(err)
                }
            };
            let finished = !was_terminal && job.status.is_terminal();
            (outcome, finished, job.done_count, job.failed_count, job.total())
        });

        let (outcome, finished, done, failed, total) = match committed {
            Ok(committed) => committed,
            Err(e) => {
                warn!("Could not record track {}: {}", work.index, e);
                return TrackOutcome::Skipped;
            }
        };

        match &outcome {
            TrackOutcome::Done { file_id } => debug!(
                "Job {} track {} done (file {})",
                work.job_id, work.index, file_id
            ),
            TrackOutcome::Failed(err) => warn!(
                "Job {} track {} failed ({}): {}",
                work.job_id,
                work.index,
                err.kind(),
                err
            ),
            TrackOutcome::Skipped => {}
        }

        if finished {
            info!(
                "Playlist job {} finished: {}/{} done, {} failed",
                work.job_id, done, total, failed
            );
            metrics::record_playlist_job("done");
        }
        outcome
    }
}
