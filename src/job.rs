//! Job records and the job status state machine.
//!
//! A job is one podcast-generation request spanning one or more articles.
//! Records live in the job store; only the worker holding the queue delivery
//! for a job id transitions its status.

use crate::error::{ArticastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identifier, assigned at creation and immutable.
///
/// Also the exact queue message body: the broker carries nothing but this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Job lifecycle states.
///
/// `NotStarted → Running → {Succeeded, Failed}`; the terminal states are
/// final. A failed job is never retried by the pipeline — the client
/// resubmits as a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Returns true for `Succeeded` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::NotStarted => "NotStarted",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ArticastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NotStarted" => Ok(JobStatus::NotStarted),
            "Running" => Ok(JobStatus::Running),
            "Succeeded" => Ok(JobStatus::Succeeded),
            "Failed" => Ok(JobStatus::Failed),
            other => Err(ArticastError::Store {
                message: format!("unknown job status '{other}'"),
            }),
        }
    }
}

/// Voice selector — a closed set of model variants behind one synthesis
/// interface, chosen per job and bound to a loaded model at worker startup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Voice {
    Male1,
    #[default]
    Female1,
}

impl Voice {
    /// All known voices, for model-bank construction and diagnostics.
    pub const ALL: [Voice; 2] = [Voice::Male1, Voice::Female1];

    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Male1 => "Male1",
            Voice::Female1 => "Female1",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = ArticastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Male1" => Ok(Voice::Male1),
            "Female1" => Ok(Voice::Female1),
            other => Err(ArticastError::InvalidVoice {
                name: other.to_string(),
            }),
        }
    }
}

/// One podcast-generation request.
///
/// `voice` and `article_urls` are immutable after creation. `created_at` and
/// `result_path` are set if and only if the job succeeded, in the same store
/// update as the `Succeeded` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub voice: Voice,
    pub article_urls: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub result_path: Option<PathBuf>,
}

impl Job {
    /// Creates a new job in `NotStarted` with a fresh id.
    pub fn new(voice: Voice, article_urls: Vec<String>) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::NotStarted,
            voice,
            article_urls,
            created_at: None,
            result_path: None,
        }
    }
}
