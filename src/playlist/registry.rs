//! Process-wide store of playlist jobs.
//!
//! Each job lives behind its own mutex. The outer map lock is only held long
//! enough to find, insert or remove a record, so a mutation on one job never
//! blocks readers of another, and a reader of the same job waits at most for
//! the mutation in progress.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::error::PlaylistError;
use super::models::{Job, JobId, JobStatus};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Published after every committed change to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub total: usize,
    pub done: usize,
    pub failed: usize,
}

impl JobEvent {
    fn of(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            total: job.total(),
            done: job.done_count,
            failed: job.failed_count,
        }
    }
}

pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Job>>>>,
    events: broadcast::Sender<JobEvent>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            jobs: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Register a job and return its id.
    pub fn create(&self, job: Job) -> JobId {
        let job_id = job.id.clone();
        let event = JobEvent::of(&job);
        self.jobs
            .write()
            .insert(job_id.clone(), Arc::new(Mutex::new(job)));
        let _ = self.events.send(event);
        job_id
    }

    fn record(&self, job_id: &str) -> Result<Arc<Mutex<Job>>, PlaylistError> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| PlaylistError::JobNotFound(job_id.to_string()))
    }

    /// Copy of the job as of now.
    pub fn get(&self, job_id: &str) -> Result<Job, PlaylistError> {
        let record = self.record(job_id)?;
        let job = record.lock().clone();
        Ok(job)
    }

    /// Apply `f` to the job atomically.
    ///
    /// No other mutation of the same job and no `get` of it can observe a
    /// partially applied `f`.
    pub fn mutate<R>(&self, job_id: &str, f: impl FnOnce(&mut Job) -> R) -> Result<R, PlaylistError> {
        let record = self.record(job_id)?;
        let mut job = record.lock();
        let result = f(&mut job);
        let event = JobEvent::of(&job);
        drop(job);
        let _ = self.events.send(event);
        Ok(result)
    }

    pub fn remove(&self, job_id: &str) -> Option<Job> {
        let record = self.jobs.write().remove(job_id)?;
        let job = record.lock().clone();
        Some(job)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of terminal jobs that finished more than `retention` before `now`.
    pub fn expired_jobs(&self, now: DateTime<Utc>, retention: Duration) -> Vec<JobId> {
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let records: Vec<Arc<Mutex<Job>>> = self.jobs.read().values().cloned().collect();

        records
            .iter()
            .filter_map(|record| {
                let job = record.lock();
                // A deadline past the representable range never expires.
                let expired = job
                    .finished_at
                    .and_then(|finished| finished.checked_add_signed(retention))
                    .is_some_and(|deadline| deadline < now);
                (expired && job.status.is_terminal()).then(|| job.id.clone())
            })
            .collect()
    }

    /// Tracks currently held by workers, across all jobs.
    pub fn in_flight_tracks(&self) -> usize {
        let records: Vec<Arc<Mutex<Job>>> = self.jobs.read().values().cloned().collect();
        records.iter().map(|r| r.lock().in_flight_count()).sum()
    }

    /// Subscribe to job change events.
    ///
    /// Events are sent after the change is visible to `get`, so a subscriber
    /// never sees a state newer than what polling returns.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }
}
