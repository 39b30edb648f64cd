//! Playlist job pipeline
//!
//! Turns a playlist reference into a job, downloads its tracks on a bounded
//! pool of workers and exposes partial results while the job runs.

mod archive;
mod error;
mod file_store;
mod manager;
mod models;
pub mod naming;
mod pipeline;
mod ports;
mod registry;
mod status;
mod worker_pool;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::{Archive, ArchiveBuilder};
pub use error::{PlaylistError, TrackError};
pub use file_store::FileStore;
pub use manager::PlaylistManager;
pub use models::*;
pub use pipeline::{TrackOutcome, TrackPipeline, TrackWork};
pub use ports::*;
pub use registry::{JobEvent, JobRegistry};
pub use status::{FileSnapshot, JobSnapshot, StatusReporter, TrackSnapshot};
pub use worker_pool::{clamp_workers, WorkerPool, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};
