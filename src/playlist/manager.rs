//! Playlist job orchestration.
//!
//! Resolves start requests into jobs, feeds their tracks to the shared
//! worker pool and answers the read side (status, files, archives).

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::PlaylistSettings;
use crate::server::metrics;

use super::archive::{Archive, ArchiveBuilder};
use super::error::PlaylistError;
use super::file_store::FileStore;
use super::models::{CompletedFile, Job, JobId};
use super::pipeline::{TrackPipeline, TrackWork};
use super::ports::{Collaborators, ResolveError};
use super::registry::{JobEvent, JobRegistry};
use super::status::{JobSnapshot, StatusReporter};
use super::worker_pool::WorkerPool;

pub struct PlaylistManager {
    settings: PlaylistSettings,
    registry: Arc<JobRegistry>,
    collaborators: Collaborators,
    file_store: Arc<FileStore>,
    worker_pool: WorkerPool,
    status_reporter: StatusReporter,
    archive_builder: ArchiveBuilder,
}

impl PlaylistManager {
    /// Create the manager and start its worker pool on the current runtime.
    pub fn new(
        settings: PlaylistSettings,
        collaborators: Collaborators,
        file_store: Arc<FileStore>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let pipeline = Arc::new(TrackPipeline::new(
            registry.clone(),
            collaborators.clone(),
            file_store.clone(),
            settings.track_timeout,
        ));
        let worker_pool = WorkerPool::start(settings.workers, pipeline);

        Self {
            status_reporter: StatusReporter::new(registry.clone()),
            archive_builder: ArchiveBuilder::new(registry.clone(), file_store.clone()),
            settings,
            registry,
            collaborators,
            file_store,
            worker_pool,
        }
    }

    /// Resolve `input` and queue all its tracks.
    ///
    /// A reference the resolver does not understand fails with
    /// `InvalidInput` and leaves no job behind. Any other resolution failure
    /// still records a failed job, whose id is carried by
    /// `PlaylistUnavailable`.
    pub async fn start(&self, input: &str) -> Result<JobId, PlaylistError> {
        let input = input.trim();
        if input.is_empty() {
            metrics::record_playlist_job("invalid");
            return Err(PlaylistError::InvalidInput(
                "Playlist reference is empty".to_string(),
            ));
        }

        let job_id = Job::new_id();
        let format = self.settings.output_format;

        let playlist = match self.collaborators.resolver.resolve(input).await {
            Ok(playlist) => playlist,
            Err(ResolveError::InvalidInput(message)) => {
                metrics::record_playlist_job("invalid");
                return Err(PlaylistError::InvalidInput(message));
            }
            Err(ResolveError::Unavailable(message)) => {
                warn!("Playlist {} unavailable: {}", input, message);
                self.registry
                    .create(Job::unavailable(job_id.clone(), input, format, message.clone()));
                metrics::record_playlist_job("unavailable");
                return Err(PlaylistError::PlaylistUnavailable { job_id, message });
            }
        };

        self.file_store.create_job_dir(&job_id).await?;

        let job = Job::resolved(job_id.clone(), input, format, playlist);
        let total = job.total();
        info!(
            "Created playlist job {} for \"{}\" with {} tracks ({})",
            job_id,
            job.playlist_title.as_deref().unwrap_or_default(),
            total,
            format
        );
        self.registry.create(job);
        metrics::record_playlist_job("started");

        for index in 1..=total {
            self.worker_pool.submit(TrackWork {
                job_id: job_id.clone(),
                index,
            });
        }

        Ok(job_id)
    }

    pub fn snapshot(&self, job_id: &str) -> Result<JobSnapshot, PlaylistError> {
        self.status_reporter.snapshot(job_id)
    }

    /// Look up a completed file. Fails with `FileGone` if its data was removed.
    pub async fn completed_file(
        &self,
        job_id: &str,
        file_id: &str,
    ) -> Result<CompletedFile, PlaylistError> {
        let job = self.registry.get(job_id)?;
        let file = job
            .file(file_id)
            .cloned()
            .ok_or_else(|| PlaylistError::FileNotFound {
                job_id: job_id.to_string(),
                file_id: file_id.to_string(),
            })?;

        if !tokio::fs::try_exists(&file.path).await.unwrap_or(false) {
            return Err(PlaylistError::FileGone(file.filename));
        }
        Ok(file)
    }

    pub async fn build_archive(&self, job_id: &str) -> Result<Archive, PlaylistError> {
        self.archive_builder.build_archive(job_id).await
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<JobEvent> {
        self.registry.subscribe()
    }

    /// Drop finished jobs older than the retention period along with their
    /// files. Returns how many jobs were removed.
    pub async fn evict_expired(&self) -> usize {
        let Some(retention) = self.settings.job_retention else {
            return 0;
        };

        let expired = self.registry.expired_jobs(Utc::now(), retention);
        for job_id in &expired {
            self.registry.remove(job_id);
            if let Err(e) = self.file_store.remove_job_dir(job_id).await {
                error!("Failed to remove files of job {}: {}", job_id, e);
            }
        }
        if !expired.is_empty() {
            info!("Evicted {} expired playlist jobs", expired.len());
        }
        expired.len()
    }

    pub fn settings(&self) -> &PlaylistSettings {
        &self.settings
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn worker_pool(&self) -> &WorkerPool {
        &self.worker_pool
    }

    pub async fn shutdown(&self) {
        self.worker_pool.shutdown().await;
    }
}
