//! Submission gateway: the narrow service surface in front of the pipeline.
//!
//! Accepts a job, records it, hands the id to the queue, and answers status
//! and artifact queries. Submission returns as soon as the record and the
//! publish are done; processing happens asynchronously in the worker pool.

use crate::error::{ArticastError, Result};
use crate::job::{Job, JobId, JobStatus, Voice};
use crate::queue::JobQueue;
use crate::store::JobStore;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// The queryable view of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub id: JobId,
    pub status: JobStatus,
    pub voice: Voice,
    /// Set only once the job has succeeded.
    pub created_at: Option<DateTime<Utc>>,
}

/// Submit a podcast-generation job.
///
/// The record is inserted as `NotStarted` before the publish, so the job is
/// queryable the moment the id is returned. A publish the broker rejects
/// marks the job `Failed` on the spot — the id is still returned and the
/// failure is visible to status queries, but no worker will ever see it.
/// An empty url list is rejected outright.
pub fn submit(
    store: &dyn JobStore,
    queue: &dyn JobQueue,
    article_urls: Vec<String>,
    voice: Voice,
) -> Result<JobId> {
    if article_urls.is_empty() {
        return Err(ArticastError::EmptyJobRequest);
    }

    let job = Job::new(voice, article_urls);
    store.insert(&job)?;

    if let Err(e) = queue.publish(&job.id) {
        store.set_status(&job.id, JobStatus::Failed)?;
        eprintln!("articast: publish failed for job {}: {e}", job.id);
    }

    Ok(job.id)
}

/// Look up a job's current state.
pub fn status(store: &dyn JobStore, id: &JobId) -> Result<JobInfo> {
    let job = store
        .fetch(id)?
        .ok_or_else(|| ArticastError::JobNotFound { id: id.to_string() })?;
    Ok(JobInfo {
        id: job.id,
        status: job.status,
        voice: job.voice,
        created_at: job.created_at,
    })
}

/// Path of the finished podcast for a succeeded job.
///
/// Anything short of `Succeeded` with a recorded result is reported as
/// not found, matching the retrieval contract.
pub fn result_file(store: &dyn JobStore, id: &JobId) -> Result<PathBuf> {
    let job = store
        .fetch(id)?
        .ok_or_else(|| ArticastError::JobNotFound { id: id.to_string() })?;
    match (job.status, job.result_path) {
        (JobStatus::Succeeded, Some(path)) => Ok(path),
        _ => Err(ArticastError::JobNotFound { id: id.to_string() }),
    }
}
