//! Job definitions for queue processing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::SamplePlan;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
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
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to whoever submitted a job.
///
/// The queue only carries this around for logging and routing; it never
/// interprets the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct OwnerRef(pub String);

impl OwnerRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a sample job.
///
/// States only move forward: `Queued → Probing → Planning → Encoding →
/// Uploading → Completed`. `Failed` can be entered from any non-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the FIFO
    #[default]
    Queued,
    /// Reading duration/resolution from the source
    Probing,
    /// Deriving the sample window, bitrate and watermark
    Planning,
    /// External encoder is running
    Encoding,
    /// Output handed to the caller
    Uploading,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Probing => "probing",
            JobState::Planning => "planning",
            JobState::Encoding => "encoding",
            JobState::Uploading => "uploading",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether the job currently occupies the single worker slot.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            JobState::Queued | JobState::Completed | JobState::Failed
        )
    }

    /// Check whether moving from `self` to `next` respects the forward-only lifecycle.
    pub fn can_advance_to(&self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobState::Failed => true,
            JobState::Completed => *self == JobState::Uploading,
            _ => next > *self,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time snapshot of a job, as returned by the queue's status lookup.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatus {
    /// Job ID
    pub job_id: JobId,

    /// Submitter
    pub owner: OwnerRef,

    /// Current state
    pub state: JobState,

    /// 1-based position among queued jobs (only while `Queued`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,

    /// Plan, once planning finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<SamplePlan>,

    /// Last forwarded encode progress in [0, 1]
    #[serde(default)]
    pub progress: f64,

    /// Submission timestamp
    pub created_at: DateTime<Utc>,

    /// When the worker picked the job up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    /// Fresh status for a newly submitted job.
    pub fn queued(job_id: JobId, owner: OwnerRef) -> Self {
        Self {
            job_id,
            owner,
            state: JobState::Queued,
            queue_position: None,
            plan: None,
            progress: 0.0,
            created_at: Utc::now(),
            started_at: None,
        }
    }
}
