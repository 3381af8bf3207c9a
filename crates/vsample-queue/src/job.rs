//! Job processing seam between the queue and the media pipeline.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use vsample_media::Workspace;
use vsample_models::{JobFailure, JobId, JobState, SamplePlan};

use crate::queue::{guarded, Registry};
use crate::sink::JobSink;

/// Runs the stages of one job.
///
/// The processor moves the job through its working states with
/// [`JobContext::advance`] and returns the output path. The queue handles
/// everything after that: delivery, cleanup and the terminal state.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    async fn process(&self, ctx: JobContext) -> Result<PathBuf, JobFailure>;
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub job_id: JobId,
    /// 1-based position among queued jobs
    pub queue_position: usize,
}

/// A job waiting in the channel.
pub(crate) struct QueuedJob {
    pub job_id: JobId,
    pub source: PathBuf,
    pub sink: Arc<dyn JobSink>,
    pub workspace: Workspace,
}

/// Handle given to a [`JobProcessor`] for one job.
#[derive(Clone)]
pub struct JobContext {
    job_id: JobId,
    source: PathBuf,
    work_dir: PathBuf,
    registry: Arc<RwLock<Registry>>,
    sink: Arc<dyn JobSink>,
}

impl JobContext {
    pub(crate) fn new(
        job_id: JobId,
        source: PathBuf,
        work_dir: PathBuf,
        registry: Arc<RwLock<Registry>>,
        sink: Arc<dyn JobSink>,
    ) -> Self {
        Self {
            job_id,
            source,
            work_dir,
            registry,
            sink,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Source file (inside the workspace when the queue adopted it).
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Scratch directory; removed after the job finishes.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Move the job to `state` and notify the sink.
    pub async fn advance(&self, state: JobState) -> Result<(), JobFailure> {
        {
            let mut registry = self.registry.write().await;
            let status = registry
                .status_mut(&self.job_id)
                .ok_or_else(|| JobFailure::internal("job record missing"))?;
            if !status.state.can_advance_to(state) {
                return Err(JobFailure::internal(format!(
                    "invalid state transition {} -> {}",
                    status.state, state
                )));
            }
            status.state = state;
        }
        debug!(job_id = %self.job_id, state = %state, "Job state changed");
        let (sink, id) = (Arc::clone(&self.sink), self.job_id.clone());
        guarded(&self.job_id, "on_state", async move {
            sink.on_state(&id, state).await;
        })
        .await;
        Ok(())
    }

    /// Record the plan. A plan can only be set once.
    pub async fn set_plan(&self, plan: SamplePlan) -> Result<(), JobFailure> {
        let mut registry = self.registry.write().await;
        let status = registry
            .status_mut(&self.job_id)
            .ok_or_else(|| JobFailure::internal("job record missing"))?;
        if status.plan.is_some() {
            return Err(JobFailure::internal("plan already set"));
        }
        status.plan = Some(plan);
        Ok(())
    }

    /// Forward an encode progress fraction.
    ///
    /// Only applies while `Encoding`; values are clamped to `[0, 1]` and
    /// anything below the last reported value is dropped.
    pub async fn report_progress(&self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        {
            let mut registry = self.registry.write().await;
            let Some(status) = registry.status_mut(&self.job_id) else {
                return;
            };
            if status.state != JobState::Encoding || fraction < status.progress {
                return;
            }
            status.progress = fraction;
        }
        let (sink, id) = (Arc::clone(&self.sink), self.job_id.clone());
        guarded(&self.job_id, "on_progress", async move {
            sink.on_progress(&id, fraction).await;
        })
        .await;
    }
}
