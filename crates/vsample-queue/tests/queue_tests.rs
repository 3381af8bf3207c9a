//! Queue behaviour tests with scripted processors.
//!
//! Each source file holds a one-word script telling the fake processor what
//! to do: `ok`, `corrupt`, `panic`, `gate`, or `sleep:<ms>`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use vsample_media::{WorkspaceManager, SAMPLE_FILE_NAME};
use vsample_models::{FailureKind, JobFailure, JobId, JobOutcome, JobState, OwnerRef};
use vsample_queue::{
    ChannelSink, JobContext, JobEvent, JobProcessor, JobQueue, JobSink, QueueConfig, QueueError,
};

struct ScriptedProcessor {
    seen: Mutex<Vec<(JobId, PathBuf)>>,
    gate: Notify,
}

impl ScriptedProcessor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            gate: Notify::new(),
        })
    }

    fn order(&self) -> Vec<JobId> {
        self.seen.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    fn sources(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl JobProcessor for ScriptedProcessor {
    async fn process(&self, ctx: JobContext) -> Result<PathBuf, JobFailure> {
        self.seen
            .lock()
            .unwrap()
            .push((ctx.job_id().clone(), ctx.source().to_path_buf()));

        let script = tokio::fs::read_to_string(ctx.source())
            .await
            .map_err(|e| JobFailure::new(FailureKind::Probe, format!("File not found: {e}")))?;

        match script.trim() {
            "corrupt" => {
                return Err(JobFailure::new(FailureKind::Probe, "Unsupported format: invalid data"))
            }
            "panic" => panic!("boom"),
            "gate" => self.gate.notified().await,
            other => {
                if let Some(ms) = other.strip_prefix("sleep:") {
                    tokio::time::sleep(Duration::from_millis(ms.parse().unwrap())).await;
                }
            }
        }

        ctx.advance(JobState::Planning).await?;
        ctx.advance(JobState::Encoding).await?;
        for fraction in [0.2, 0.1, 0.6, 1.0] {
            ctx.report_progress(fraction).await;
        }

        let output = ctx.work_dir().join(SAMPLE_FILE_NAME);
        assert_ne!(ctx.source(), output.as_path(), "source would be overwritten");
        tokio::fs::write(&output, b"sample").await.unwrap();
        Ok(output)
    }
}

/// Sink that checks the output still exists while `on_complete` runs.
#[derive(Default)]
struct RecordingSink {
    completions: Mutex<Vec<(JobId, JobOutcome, bool)>>,
}

#[async_trait]
impl JobSink for RecordingSink {
    async fn on_progress(&self, _job_id: &JobId, _fraction: f64) {}

    async fn on_complete(&self, job_id: &JobId, outcome: JobOutcome) {
        let output_exists = outcome.output_path().is_some_and(|p| p.is_file());
        self.completions
            .lock()
            .unwrap()
            .push((job_id.clone(), outcome, output_exists));
    }
}

/// Sink whose progress and working-state callbacks panic.
#[derive(Default)]
struct PanickingSink {
    inner: RecordingSink,
}

#[async_trait]
impl JobSink for PanickingSink {
    async fn on_state(&self, _job_id: &JobId, state: JobState) {
        if state == JobState::Planning {
            panic!("sink failed on {state}");
        }
    }

    async fn on_progress(&self, _job_id: &JobId, _fraction: f64) {
        panic!("sink failed on progress");
    }

    async fn on_complete(&self, job_id: &JobId, outcome: JobOutcome) {
        self.inner.on_complete(job_id, outcome).await;
    }
}

struct Fixture {
    _root: TempDir,
    uploads: PathBuf,
    work: PathBuf,
    processor: Arc<ScriptedProcessor>,
    queue: JobQueue,
}

fn fixture(config: QueueConfig) -> Fixture {
    let root = TempDir::new().unwrap();
    let uploads = root.path().join("uploads");
    let work = root.path().join("work");
    std::fs::create_dir_all(&uploads).unwrap();

    let processor = ScriptedProcessor::new();
    let queue = JobQueue::start(processor.clone(), WorkspaceManager::new(&work), config);

    Fixture {
        _root: root,
        uploads,
        work,
        processor,
        queue,
    }
}

impl Fixture {
    fn source(&self, name: &str, script: &str) -> PathBuf {
        let path = self.uploads.join(name);
        std::fs::write(&path, script).unwrap();
        path
    }

    fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(&self.work).map(|d| d.count()).unwrap_or(0)
    }
}

async fn wait_for_state(queue: &JobQueue, job_id: &JobId, state: JobState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if queue.status_of(job_id).await.map(|s| s.state) == Some(state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job never reached state");
}

#[tokio::test]
async fn jobs_run_in_submission_order() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(RecordingSink::default());

    let mut ids = Vec::new();
    for (i, delay) in [80, 40, 0, 20, 5].iter().enumerate() {
        let source = fx.source(&format!("v{i}.mp4"), &format!("sleep:{delay}"));
        let submission = fx
            .queue
            .submit(source, OwnerRef::new("user-1"), sink.clone())
            .await
            .unwrap();
        ids.push(submission.job_id);
    }
    fx.queue.shutdown().await;

    assert_eq!(fx.processor.order(), ids);
    let completions = sink.completions.lock().unwrap();
    let completed: Vec<JobId> = completions.iter().map(|(id, _, _)| id.clone()).collect();
    assert_eq!(completed, ids);
    assert!(completions.iter().all(|(_, outcome, _)| outcome.is_success()));
}

#[tokio::test]
async fn corrupt_file_fails_without_blocking_later_jobs() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(RecordingSink::default());

    let a = fx.queue.submit(fx.source("a.mp4", "ok"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    let b = fx.queue.submit(fx.source("b.mp4", "corrupt"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    let c = fx.queue.submit(fx.source("c.mp4", "ok"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.shutdown().await;

    let completions = sink.completions.lock().unwrap();
    assert_eq!(completions.len(), 3);

    assert_eq!(completions[0].0, a.job_id);
    assert!(completions[0].1.is_success());

    assert_eq!(completions[1].0, b.job_id);
    let failure = completions[1].1.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Probe);
    assert!(failure.message.contains("Unsupported format"));

    assert_eq!(completions[2].0, c.job_id);
    assert!(completions[2].1.is_success());
}

#[tokio::test]
async fn panic_is_contained_to_its_job() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(RecordingSink::default());

    fx.queue.submit(fx.source("bad.mp4", "panic"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.submit(fx.source("good.mp4", "ok"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.shutdown().await;

    let completions = sink.completions.lock().unwrap();
    assert_eq!(completions.len(), 2);
    let failure = completions[0].1.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Internal);
    assert!(failure.message.contains("boom"));
    assert!(completions[1].1.is_success());
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[tokio::test]
async fn panicking_sink_does_not_fail_the_job() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(PanickingSink::default());

    fx.queue.submit(fx.source("a.mp4", "ok"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.submit(fx.source("b.mp4", "ok"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.shutdown().await;

    let completions = sink.inner.completions.lock().unwrap();
    assert_eq!(completions.len(), 2);
    assert!(completions.iter().all(|(_, outcome, _)| outcome.is_success()));
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[tokio::test]
async fn workspace_is_removed_after_delivery() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(RecordingSink::default());

    let source = fx.source("clip.mp4", "ok");
    fx.queue.submit(source.clone(), OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.shutdown().await;

    let completions = sink.completions.lock().unwrap();
    let (_, outcome, existed_during_delivery) = &completions[0];
    let output = outcome.output_path().unwrap();

    assert!(*existed_during_delivery);
    assert!(!output.exists());
    assert!(!output.parent().unwrap().exists());
    // adopted into the workspace and removed with it
    assert!(!source.exists());
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[tokio::test]
async fn upload_named_like_the_sample_still_completes() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(RecordingSink::default());

    let source = fx.source(SAMPLE_FILE_NAME, "ok");
    fx.queue.submit(source, OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.shutdown().await;

    let adopted = &fx.processor.sources()[0];
    assert_eq!(adopted.file_name().unwrap(), "source.mp4");

    let completions = sink.completions.lock().unwrap();
    let output = completions[0].1.output_path().unwrap();
    assert_ne!(adopted, output);
    assert!(completions[0].2);
}

#[tokio::test]
async fn source_is_left_alone_without_adoption() {
    let fx = fixture(QueueConfig { adopt_source: false });
    let sink = Arc::new(RecordingSink::default());

    let source = fx.source("keep.mp4", "ok");
    fx.queue.submit(source.clone(), OwnerRef::new("u"), sink.clone()).await.unwrap();
    fx.queue.shutdown().await;

    assert!(source.exists());
    assert!(sink.completions.lock().unwrap()[0].1.is_success());
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[tokio::test]
async fn missing_source_is_a_probe_failure() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(RecordingSink::default());

    fx.queue
        .submit(fx.uploads.join("gone.mp4"), OwnerRef::new("u"), sink.clone())
        .await
        .unwrap();
    fx.queue.shutdown().await;

    let completions = sink.completions.lock().unwrap();
    assert_eq!(completions[0].1.failure().unwrap().kind, FailureKind::Probe);
}

#[tokio::test]
async fn queue_positions_and_status_lifecycle() {
    let fx = fixture(QueueConfig::default());
    let sink = Arc::new(RecordingSink::default());

    let first = fx.queue.submit(fx.source("first.mp4", "gate"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    assert_eq!(first.queue_position, 1);
    wait_for_state(&fx.queue, &first.job_id, JobState::Probing).await;

    let second = fx.queue.submit(fx.source("second.mp4", "ok"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    let third = fx.queue.submit(fx.source("third.mp4", "ok"), OwnerRef::new("u"), sink.clone()).await.unwrap();
    assert_eq!(second.queue_position, 1);
    assert_eq!(third.queue_position, 2);

    let active = fx.queue.status_of(&first.job_id).await.unwrap();
    assert_eq!(active.queue_position, None);
    assert!(active.started_at.is_some());
    assert_eq!(fx.queue.status_of(&third.job_id).await.unwrap().queue_position, Some(2));
    assert_eq!(fx.queue.len().await, 3);

    fx.processor.gate.notify_one();
    fx.queue.shutdown().await;

    assert!(fx.queue.status_of(&first.job_id).await.is_none());
    assert!(fx.queue.status_of(&third.job_id).await.is_none());
    assert!(fx.queue.is_empty().await);
}

#[tokio::test]
async fn events_arrive_in_lifecycle_order() {
    let fx = fixture(QueueConfig::default());
    let (sink, mut rx) = ChannelSink::channel();

    let submission = fx
        .queue
        .submit(fx.source("v.mp4", "ok"), OwnerRef::new("u"), Arc::new(sink))
        .await
        .unwrap();
    fx.queue.shutdown().await;

    let mut states = Vec::new();
    let mut fractions = Vec::new();
    let mut completes = 0;
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.job_id(), &submission.job_id);
        assert_eq!(completes, 0, "nothing may follow on_complete");
        match event {
            JobEvent::State { state, .. } => states.push(state),
            JobEvent::Progress { fraction, .. } => fractions.push(fraction),
            JobEvent::Complete { outcome, .. } => {
                assert!(outcome.is_success());
                completes += 1;
            }
        }
    }

    assert_eq!(completes, 1);
    assert_eq!(
        states,
        vec![JobState::Probing, JobState::Planning, JobState::Encoding, JobState::Uploading]
    );
    assert_eq!(fractions, vec![0.2, 0.6, 1.0]);
}

#[tokio::test]
async fn submit_after_shutdown_is_rejected() {
    let fx = fixture(QueueConfig::default());
    fx.queue.shutdown().await;

    let (sink, _rx) = ChannelSink::channel();
    let result = fx
        .queue
        .submit(fx.source("late.mp4", "ok"), OwnerRef::new("u"), Arc::new(sink))
        .await;

    assert!(matches!(result, Err(QueueError::Closed)));
    assert_eq!(fx.leftover_workspaces(), 0);
    assert!(fx.uploads.join("late.mp4").exists());
}
