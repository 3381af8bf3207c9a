//! Delivery of job updates to the submitting caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use vsample_models::{JobId, JobOutcome, JobState};

/// Receives updates for the jobs submitted with it.
///
/// Calls for one job are never concurrent and arrive in order: state changes
/// and progress while the job runs, then exactly one `on_complete`.
#[async_trait]
pub trait JobSink: Send + Sync {
    /// The job entered `state`.
    async fn on_state(&self, _job_id: &JobId, _state: JobState) {}

    /// Encode progress in `[0, 1]`, non-decreasing.
    async fn on_progress(&self, job_id: &JobId, fraction: f64);

    /// Final result. The output file still exists while this runs.
    async fn on_complete(&self, job_id: &JobId, outcome: JobOutcome);
}

/// A job update as a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    State { job_id: JobId, state: JobState },
    Progress { job_id: JobId, fraction: f64 },
    Complete { job_id: JobId, outcome: JobOutcome },
}

impl JobEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            JobEvent::State { job_id, .. }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Complete { job_id, .. } => job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Complete { .. })
    }
}

/// Sink that forwards every update into a channel.
///
/// Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<JobEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl JobSink for ChannelSink {
    async fn on_state(&self, job_id: &JobId, state: JobState) {
        let _ = self.tx.send(JobEvent::State {
            job_id: job_id.clone(),
            state,
        });
    }

    async fn on_progress(&self, job_id: &JobId, fraction: f64) {
        let _ = self.tx.send(JobEvent::Progress {
            job_id: job_id.clone(),
            fraction,
        });
    }

    async fn on_complete(&self, job_id: &JobId, outcome: JobOutcome) {
        let _ = self.tx.send(JobEvent::Complete {
            job_id: job_id.clone(),
            outcome,
        });
    }
}
