//! End-to-end tests of the queue driving the sample processor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use vsample_media::WorkspaceManager;
use vsample_models::{FailureKind, OwnerRef, SampleConfig};
use vsample_queue::{ChannelSink, JobEvent, JobQueue, QueueConfig};
use vsample_worker::{CliSink, Delivery, SampleProcessor};

fn start_queue(work: &Path, adopt_source: bool) -> JobQueue {
    let processor = Arc::new(SampleProcessor::new(SampleConfig::default()));
    JobQueue::start(processor, WorkspaceManager::new(work), QueueConfig { adopt_source })
}

async fn generate_video(path: &Path, seconds: u32) {
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={seconds}:size=640x360:rate=25"))
        .args(["-f", "lavfi", "-i"])
        .arg(format!("sine=frequency=440:duration={seconds}"))
        .args(["-shortest"])
        .arg(path)
        .status()
        .await
        .expect("ffmpeg not runnable");
    assert!(status.success());
}

#[tokio::test]
async fn unreadable_inputs_fail_as_probe_errors() {
    let dir = TempDir::new().unwrap();
    let garbage = dir.path().join("garbage.mp4");
    std::fs::write(&garbage, b"definitely not a video").unwrap();
    let missing = dir.path().join("missing.mkv");

    let queue = start_queue(&dir.path().join("work"), false);
    let (sink, mut rx) = ChannelSink::channel();
    let sink = Arc::new(sink);

    let first = queue.submit(&garbage, OwnerRef::new("t"), sink.clone()).await.unwrap();
    let second = queue.submit(&missing, OwnerRef::new("t"), sink.clone()).await.unwrap();
    queue.shutdown().await;

    let mut outcomes = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let JobEvent::Complete { job_id, outcome } = event {
            outcomes.push((job_id, outcome));
        }
    }

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].0, first.job_id);
    assert_eq!(outcomes[1].0, second.job_id);
    for (_, outcome) in &outcomes {
        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Probe);
    }
    assert!(garbage.exists());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn samples_are_encoded_and_delivered_in_order() {
    let dir = TempDir::new().unwrap();
    let long = dir.path().join("long.mp4");
    let short = dir.path().join("short.mkv");
    let corrupt = dir.path().join("corrupt.mp4");
    generate_video(&long, 150).await;
    generate_video(&short, 8).await;
    std::fs::write(&corrupt, b"garbage").unwrap();

    let work = dir.path().join("work");
    let out = dir.path().join("samples");
    let queue = start_queue(&work, true);
    let (tx, mut rx) = mpsc::unbounded_channel();

    for source in [&long, &corrupt, &short] {
        let sink = CliSink::new(source, &out, tx.clone()).quiet(true);
        queue.submit(source, OwnerRef::new("t"), Arc::new(sink)).await.unwrap();
    }
    drop(tx);
    queue.shutdown().await;

    let mut deliveries = Vec::new();
    while let Some(delivery) = rx.recv().await {
        deliveries.push(delivery);
    }

    assert_eq!(deliveries.len(), 3);
    let saved: Vec<PathBuf> = deliveries
        .iter()
        .filter_map(|d| match d {
            Delivery::Saved { path, .. } => Some(path.clone()),
            Delivery::Failed { .. } => None,
        })
        .collect();
    assert_eq!(saved, vec![out.join("long_sample.mp4"), out.join("short_sample.mp4")]);
    match &deliveries[1] {
        Delivery::Failed { failure, .. } => assert_eq!(failure.kind, FailureKind::Probe),
        other => panic!("unexpected delivery {other:?}"),
    }

    let info = vsample_media::probe_video(out.join("long_sample.mp4")).await.unwrap();
    assert!((info.duration - 30.0).abs() < 1.0);
    let info = vsample_media::probe_video(out.join("short_sample.mp4")).await.unwrap();
    assert!((info.duration - 8.0).abs() < 1.0);

    // inputs were adopted into the workspaces and removed with them
    assert!(!long.exists());
    assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
}
