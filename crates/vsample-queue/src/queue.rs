//! In-process FIFO with a single worker task.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, info_span, warn, Instrument, Span};

use vsample_media::{adopt_file, MediaError, Workspace, WorkspaceManager};
use vsample_models::{
    FailureKind, JobFailure, JobId, JobOutcome, JobState, JobStatus, OwnerRef,
};

use crate::error::{QueueError, QueueResult};
use crate::job::{JobContext, JobProcessor, QueuedJob, Submission};
use crate::metrics;
use crate::sink::JobSink;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Move each source into its workspace when the job starts, so the
    /// source is deleted together with the workspace.
    pub adopt_source: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { adopt_source: true }
    }
}

struct JobRecord {
    seq: u64,
    status: JobStatus,
}

/// Status table for jobs that have not been retired yet.
#[derive(Default)]
pub(crate) struct Registry {
    records: HashMap<JobId, JobRecord>,
    next_seq: u64,
}

impl Registry {
    pub(crate) fn status_mut(&mut self, job_id: &JobId) -> Option<&mut JobStatus> {
        self.records.get_mut(job_id).map(|r| &mut r.status)
    }

    fn insert(&mut self, status: JobStatus) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(status.job_id.clone(), JobRecord { seq, status });
    }

    /// 1 + number of queued jobs submitted earlier; `None` unless queued.
    fn position(&self, job_id: &JobId) -> Option<usize> {
        let record = self.records.get(job_id)?;
        if record.status.state != JobState::Queued {
            return None;
        }
        let ahead = self
            .records
            .values()
            .filter(|r| r.status.state == JobState::Queued && r.seq < record.seq)
            .count();
        Some(ahead + 1)
    }

    fn snapshot(&self, job_id: &JobId) -> Option<JobStatus> {
        let mut status = self.records.get(job_id)?.status.clone();
        status.queue_position = self.position(job_id);
        Some(status)
    }
}

struct Shared {
    registry: Arc<RwLock<Registry>>,
    processor: Arc<dyn JobProcessor>,
    config: QueueConfig,
}

/// Single-worker job queue.
///
/// Jobs run strictly one at a time in submission order. Every job ends with
/// exactly one `on_complete` call on its sink, after which its workspace is
/// removed and its record dropped.
pub struct JobQueue {
    shared: Arc<Shared>,
    workspaces: WorkspaceManager,
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobQueue {
    /// Create the queue and spawn its worker on the current runtime.
    pub fn start(
        processor: Arc<dyn JobProcessor>,
        workspaces: WorkspaceManager,
        config: QueueConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            registry: Arc::new(RwLock::new(Registry::default())),
            processor,
            config,
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), rx));

        Self {
            shared,
            workspaces,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append a job. Never waits for the worker.
    ///
    /// The job's workspace is allocated here, so a workspace failure is
    /// returned to the caller instead of becoming a failed job.
    pub async fn submit(
        &self,
        source: impl Into<PathBuf>,
        owner: OwnerRef,
        sink: Arc<dyn JobSink>,
    ) -> QueueResult<Submission> {
        let source = source.into();
        let job_id = JobId::new();

        let workspace = self
            .workspaces
            .acquire(&job_id)
            .map_err(|e| QueueError::workspace(e.to_string()))?;

        // Registry lock is held across the send so sequence order matches channel order.
        let mut registry = self.shared.registry.write().await;
        let sender_guard = self.sender.lock().await;
        let Some(sender) = sender_guard.as_ref() else {
            return Err(QueueError::Closed);
        };

        registry.insert(JobStatus::queued(job_id.clone(), owner.clone()));
        let queued = QueuedJob {
            job_id: job_id.clone(),
            source: source.clone(),
            sink,
            workspace,
        };
        if sender.send(queued).is_err() {
            registry.records.remove(&job_id);
            return Err(QueueError::Closed);
        }

        let queue_position = registry.position(&job_id).unwrap_or(1);
        let len = registry.records.len();
        drop(registry);

        metrics::record_job_enqueued();
        metrics::set_queue_length(len);
        info!(
            job_id = %job_id,
            owner = %owner,
            source = %source.display(),
            queue_position,
            "Job enqueued"
        );

        Ok(Submission {
            job_id,
            queue_position,
        })
    }

    /// Current status, or `None` once the job has been retired.
    pub async fn status_of(&self, job_id: &JobId) -> Option<JobStatus> {
        self.shared.registry.read().await.snapshot(job_id)
    }

    /// Number of queued plus active jobs.
    pub async fn len(&self) -> usize {
        self.shared.registry.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop accepting jobs, let the worker finish the ones already queued,
    /// then wait for it to exit.
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();

        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        if let Err(e) = worker.await {
            error!("Queue worker terminated abnormally: {}", e);
        }
    }
}

async fn run_worker(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<QueuedJob>) {
    info!("Queue worker started");
    while let Some(job) = rx.recv().await {
        let span = info_span!("job", job_id = %job.job_id);
        shared.run_job(job).instrument(span).await;
    }
    info!("Queue worker stopped");
}

impl Shared {
    async fn run_job(&self, job: QueuedJob) {
        let QueuedJob {
            job_id,
            source,
            sink,
            workspace,
        } = job;
        let started = Instant::now();

        self.begin(&job_id).await;
        info!(job_id = %job_id, "Job started");
        {
            let (sink, id) = (Arc::clone(&sink), job_id.clone());
            guarded(&job_id, "on_state", async move {
                sink.on_state(&id, JobState::Probing).await
            })
            .await;
        }

        let result = match self.prepare_source(&source, &workspace).await {
            Ok(source) => {
                self.execute(&job_id, source, workspace.path().to_path_buf(), Arc::clone(&sink))
                    .await
            }
            Err(failure) => Err(failure),
        };

        let terminal = match &result {
            Ok(_) => {
                self.set_state(&job_id, JobState::Uploading).await;
                let (sink, id) = (Arc::clone(&sink), job_id.clone());
                guarded(&job_id, "on_state", async move {
                    sink.on_state(&id, JobState::Uploading).await
                })
                .await;
                JobState::Completed
            }
            Err(_) => JobState::Failed,
        };

        let outcome = JobOutcome::from(result);
        {
            let (sink, id, outcome) = (Arc::clone(&sink), job_id.clone(), outcome.clone());
            guarded(&job_id, "on_complete", async move {
                sink.on_complete(&id, outcome).await
            })
            .await;
        }

        if let Err(e) = workspace.close() {
            warn!(job_id = %job_id, "Workspace cleanup failed: {}", e);
        }

        self.set_state(&job_id, terminal).await;
        let remaining = self.retire(&job_id).await;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::set_queue_length(remaining);
        match outcome.failure() {
            None => {
                metrics::record_job_completed(elapsed);
                info!(job_id = %job_id, elapsed_secs = elapsed, "Job completed");
            }
            Some(failure) => {
                metrics::record_job_failed(failure.kind, elapsed);
                warn!(
                    job_id = %job_id,
                    kind = %failure.kind,
                    elapsed_secs = elapsed,
                    "Job failed: {}", failure.message
                );
            }
        }
    }

    async fn begin(&self, job_id: &JobId) {
        let mut registry = self.registry.write().await;
        if let Some(status) = registry.status_mut(job_id) {
            status.state = JobState::Probing;
            status.started_at = Some(Utc::now());
        }
    }

    /// Record a state chosen by the worker itself.
    async fn set_state(&self, job_id: &JobId, state: JobState) {
        let mut registry = self.registry.write().await;
        if let Some(status) = registry.status_mut(job_id) {
            if status.state.can_advance_to(state) {
                status.state = state;
            } else {
                warn!(job_id = %job_id, from = %status.state, to = %state, "Ignoring state change");
            }
        }
    }

    /// Drop the record; returns the remaining job count.
    async fn retire(&self, job_id: &JobId) -> usize {
        let mut registry = self.registry.write().await;
        registry.records.remove(job_id);
        registry.records.len()
    }

    async fn prepare_source(
        &self,
        source: &Path,
        workspace: &Workspace,
    ) -> Result<PathBuf, JobFailure> {
        if !self.config.adopt_source {
            return Ok(source.to_path_buf());
        }
        match adopt_file(source, workspace.path()).await {
            Ok(adopted) => Ok(adopted),
            // Leave it to the probe to report a missing source.
            Err(MediaError::FileNotFound(_)) => Ok(source.to_path_buf()),
            Err(e) => Err(JobFailure::new(
                FailureKind::Workspace,
                format!("could not move source into workspace: {}", e),
            )),
        }
    }

    /// Run the processor in its own task so a panic cannot take the worker down.
    async fn execute(
        &self,
        job_id: &JobId,
        source: PathBuf,
        work_dir: PathBuf,
        sink: Arc<dyn JobSink>,
    ) -> Result<PathBuf, JobFailure> {
        let ctx = JobContext::new(
            job_id.clone(),
            source,
            work_dir,
            Arc::clone(&self.registry),
            sink,
        );
        let processor = Arc::clone(&self.processor);
        let task = tokio::spawn(async move { processor.process(ctx).await }.instrument(Span::current()));

        match task.await {
            Ok(result) => result,
            Err(e) => Err(JobFailure::internal(describe_join_error(e))),
        }
    }
}

/// Run a sink callback in its own task; a panicking sink is logged and ignored.
pub(crate) async fn guarded<F>(job_id: &JobId, callback: &str, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(e) = tokio::spawn(fut.instrument(Span::current())).await {
        error!(job_id = %job_id, "Sink {} failed: {}", callback, describe_join_error(e));
    }
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("job task failed: {}", err);
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("job panicked: {}", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_count_only_earlier_queued_jobs() {
        let mut registry = Registry::default();
        let ids: Vec<JobId> = (0..4).map(|i| JobId::from_string(format!("j{i}"))).collect();
        for id in &ids {
            registry.insert(JobStatus::queued(id.clone(), OwnerRef::new("u")));
        }

        assert_eq!(registry.position(&ids[0]), Some(1));
        assert_eq!(registry.position(&ids[3]), Some(4));

        registry.status_mut(&ids[0]).unwrap().state = JobState::Encoding;
        assert_eq!(registry.position(&ids[0]), None);
        assert_eq!(registry.position(&ids[1]), Some(1));
        assert_eq!(registry.position(&ids[3]), Some(3));

        registry.records.remove(&ids[1]);
        assert_eq!(registry.position(&ids[2]), Some(1));
        assert_eq!(registry.snapshot(&ids[3]).unwrap().queue_position, Some(2));
        assert!(registry.snapshot(&ids[1]).is_none());
    }

    #[tokio::test]
    async fn test_describe_panic() {
        let err = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        assert_eq!(describe_join_error(err), "job panicked: boom");

        let err = tokio::spawn(async { panic!("{} {}", "formatted", 1) }).await.unwrap_err();
        assert_eq!(describe_join_error(err), "job panicked: formatted 1");
    }
}
