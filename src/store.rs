//! Job store: durable job records with atomic field updates.
//!
//! One record per job, keyed by job id. Only the worker holding the queue
//! delivery for an id writes to it (single-writer by construction); the rare
//! post-crash redelivery race re-writes the same terminal state, which is
//! benign.

use crate::defaults;
use crate::error::{ArticastError, Result};
use crate::job::{Job, JobId, JobStatus, Voice};
use chrono::{DateTime, Utc};
use redis::Commands;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Trait for job record storage.
///
/// The persistence engine behind it is opaque; the pipeline only needs
/// insert, point lookup, and atomic field updates.
pub trait JobStore: Send + Sync {
    /// Insert a freshly created job record.
    fn insert(&self, job: &Job) -> Result<()>;

    /// Fetch a job by id; `None` for unknown ids.
    fn fetch(&self, id: &JobId) -> Result<Option<Job>>;

    /// Update only the status field.
    fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()>;

    /// Terminal success: set status, result path, and creation timestamp in
    /// one atomic update.
    fn mark_succeeded(&self, id: &JobId, result_path: &Path, created_at: DateTime<Utc>)
    -> Result<()>;
}

// Field names of the job record.
const F_STATUS: &str = "status";
const F_VOICE: &str = "voice";
const F_URLS: &str = "article_urls";
const F_CREATED_AT: &str = "created_at";
const F_RESULT_PATH: &str = "result_path";

/// Broker-backed job store: one hash per job under
/// [`defaults::JOB_KEY_PREFIX`]. `HSET` of multiple fields is a single
/// command, which gives the atomic terminal transition for free.
pub struct RedisJobStore {
    conn: Mutex<redis::Connection>,
    key_prefix: String,
}

impl RedisJobStore {
    /// Connect to the broker at `url`.
    pub fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection()?;
        Ok(Self {
            conn: Mutex::new(conn),
            key_prefix: defaults::JOB_KEY_PREFIX.to_string(),
        })
    }

    fn key(&self, id: &JobId) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, redis::Connection>> {
        self.conn.lock().map_err(|_| ArticastError::Store {
            message: "store connection lock poisoned".to_string(),
        })
    }
}

impl JobStore for RedisJobStore {
    fn insert(&self, job: &Job) -> Result<()> {
        let urls = serde_json::to_string(&job.article_urls).map_err(|e| ArticastError::Store {
            message: format!("failed to encode article urls: {e}"),
        })?;
        let fields = [
            (F_STATUS, job.status.as_str().to_string()),
            (F_VOICE, job.voice.as_str().to_string()),
            (F_URLS, urls),
        ];
        let key = self.key(&job.id);
        let mut conn = self.lock_conn()?;
        let _: () = conn.hset_multiple(key, &fields)?;
        Ok(())
    }

    fn fetch(&self, id: &JobId) -> Result<Option<Job>> {
        let key = self.key(id);
        let map: HashMap<String, String> = {
            let mut conn = self.lock_conn()?;
            conn.hgetall(key)?
        };
        if map.is_empty() {
            return Ok(None);
        }
        parse_record(id, &map).map(Some)
    }

    fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        let key = self.key(id);
        let mut conn = self.lock_conn()?;
        let _: () = conn.hset(key, F_STATUS, status.as_str())?;
        Ok(())
    }

    fn mark_succeeded(
        &self,
        id: &JobId,
        result_path: &Path,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let fields = [
            (F_STATUS, JobStatus::Succeeded.as_str().to_string()),
            (F_RESULT_PATH, result_path.to_string_lossy().to_string()),
            (F_CREATED_AT, created_at.to_rfc3339()),
        ];
        let key = self.key(id);
        let mut conn = self.lock_conn()?;
        let _: () = conn.hset_multiple(key, &fields)?;
        Ok(())
    }
}

fn parse_record(id: &JobId, map: &HashMap<String, String>) -> Result<Job> {
    let status: JobStatus = map
        .get(F_STATUS)
        .ok_or_else(|| missing_field(id, F_STATUS))?
        .parse()?;
    let voice: Voice = map
        .get(F_VOICE)
        .ok_or_else(|| missing_field(id, F_VOICE))?
        .parse()?;
    let article_urls: Vec<String> = serde_json::from_str(
        map.get(F_URLS).ok_or_else(|| missing_field(id, F_URLS))?,
    )
    .map_err(|e| ArticastError::Store {
        message: format!("corrupt article url list for job {id}: {e}"),
    })?;
    let created_at = map
        .get(F_CREATED_AT)
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ArticastError::Store {
                    message: format!("corrupt timestamp for job {id}: {e}"),
                })
        })
        .transpose()?;
    let result_path = map.get(F_RESULT_PATH).map(PathBuf::from);

    Ok(Job {
        id: id.clone(),
        status,
        voice,
        article_urls,
        created_at,
        result_path,
    })
}

fn missing_field(id: &JobId, field: &str) -> ArticastError {
    ArticastError::Store {
        message: format!("job {id} record is missing field '{field}'"),
    }
}

/// In-memory job store for tests and the mock seam.
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn with_jobs<T>(&self, f: impl FnOnce(&mut HashMap<JobId, Job>) -> Result<T>) -> Result<T> {
        let mut jobs = self.jobs.lock().map_err(|_| ArticastError::Store {
            message: "memory store lock poisoned".to_string(),
        })?;
        f(&mut jobs)
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: &Job) -> Result<()> {
        self.with_jobs(|jobs| {
            jobs.insert(job.id.clone(), job.clone());
            Ok(())
        })
    }

    fn fetch(&self, id: &JobId) -> Result<Option<Job>> {
        self.with_jobs(|jobs| Ok(jobs.get(id).cloned()))
    }

    fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        self.with_jobs(|jobs| {
            let job = jobs.get_mut(id).ok_or_else(|| ArticastError::JobNotFound {
                id: id.to_string(),
            })?;
            job.status = status;
            Ok(())
        })
    }

    fn mark_succeeded(
        &self,
        id: &JobId,
        result_path: &Path,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_jobs(|jobs| {
            let job = jobs.get_mut(id).ok_or_else(|| ArticastError::JobNotFound {
                id: id.to_string(),
            })?;
            job.status = JobStatus::Succeeded;
            job.result_path = Some(result_path.to_path_buf());
            job.created_at = Some(created_at);
            Ok(())
        })
    }
}
