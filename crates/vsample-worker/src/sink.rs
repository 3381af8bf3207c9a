//! Terminal front end: status lines, progress bars and delivery of samples.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::warn;

use vsample_models::{format_progress_bar, FailureKind, JobFailure, JobId, JobOutcome, JobState};
use vsample_queue::JobSink;

const PROGRESS_BAR_LEN: usize = 10;

/// Where a job's result ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Saved { job_id: JobId, path: PathBuf },
    Failed { job_id: JobId, failure: JobFailure },
}

impl Delivery {
    pub fn is_saved(&self) -> bool {
        matches!(self, Delivery::Saved { .. })
    }
}

/// `clip.mkv` becomes `clip_sample.mp4`.
pub fn sample_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    format!("{}_sample.mp4", stem)
}

/// First free path for `name` in `dir`, adding `_2`, `_3`, ... before the extension.
fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, "mp4"));
    (2..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Per-submission sink that prints progress and copies the finished sample
/// into the output directory before the workspace is removed.
pub struct CliSink {
    label: String,
    target_name: String,
    output_dir: PathBuf,
    deliveries: mpsc::UnboundedSender<Delivery>,
    quiet: bool,
}

impl CliSink {
    pub fn new(
        source: &Path,
        output_dir: impl Into<PathBuf>,
        deliveries: mpsc::UnboundedSender<Delivery>,
    ) -> Self {
        let label = source
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source.display().to_string());
        Self {
            label,
            target_name: sample_file_name(source),
            output_dir: output_dir.into(),
            deliveries,
            quiet: false,
        }
    }

    /// Suppress terminal output.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn say(&self, message: &str) {
        if !self.quiet {
            println!("[{}] {}", self.label, message);
        }
    }

    async fn save(&self, output: &Path) -> Result<PathBuf, JobFailure> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| JobFailure::new(FailureKind::Workspace, format!("output dir: {e}")))?;
        let dest = unique_destination(&self.output_dir, &self.target_name);
        tokio::fs::copy(output, &dest).await.map_err(|e| {
            JobFailure::new(
                FailureKind::Workspace,
                format!("could not save sample to {}: {}", dest.display(), e),
            )
        })?;
        Ok(dest)
    }
}

#[async_trait]
impl JobSink for CliSink {
    async fn on_state(&self, _job_id: &JobId, state: JobState) {
        match state {
            JobState::Probing => self.say("Analyzing video..."),
            JobState::Planning => self.say("Planning sample..."),
            JobState::Encoding => self.say("Cutting sample from the middle..."),
            JobState::Uploading => self.say("Saving sample..."),
            _ => {}
        }
    }

    async fn on_progress(&self, _job_id: &JobId, fraction: f64) {
        self.say(&format!(
            "Processing sample... {}",
            format_progress_bar(fraction, PROGRESS_BAR_LEN)
        ));
    }

    async fn on_complete(&self, job_id: &JobId, outcome: JobOutcome) {
        let delivery = match outcome {
            JobOutcome::Completed { output_path } => match self.save(&output_path).await {
                Ok(path) => {
                    self.say(&format!("Sample ready: {}", path.display()));
                    Delivery::Saved {
                        job_id: job_id.clone(),
                        path,
                    }
                }
                Err(failure) => {
                    warn!(job_id = %job_id, "{}", failure);
                    self.say(&format!("Failed: {}", failure));
                    Delivery::Failed {
                        job_id: job_id.clone(),
                        failure,
                    }
                }
            },
            JobOutcome::Failed(failure) => {
                self.say(&format!("Failed: {}", failure));
                Delivery::Failed {
                    job_id: job_id.clone(),
                    failure,
                }
            }
        };
        let _ = self.deliveries.send(delivery);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_file_name() {
        assert_eq!(sample_file_name(Path::new("/in/My Clip.MKV")), "My Clip_sample.mp4");
        assert_eq!(sample_file_name(Path::new("a.b.mp4")), "a.b_sample.mp4");
    }

    #[test]
    fn test_unique_destination() {
        let dir = TempDir::new().unwrap();
        assert_eq!(unique_destination(dir.path(), "v_sample.mp4"), dir.path().join("v_sample.mp4"));
        std::fs::write(dir.path().join("v_sample.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("v_sample_2.mp4"), b"x").unwrap();
        assert_eq!(
            unique_destination(dir.path(), "v_sample.mp4"),
            dir.path().join("v_sample_3.mp4")
        );
    }

    #[tokio::test]
    async fn test_completed_sample_is_copied() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let output = work.path().join("sample.mp4");
        std::fs::write(&output, b"encoded").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = CliSink::new(Path::new("/uploads/clip.mkv"), out.path().join("samples"), tx).quiet(true);
        let id = JobId::new();
        sink.on_complete(&id, JobOutcome::Completed { output_path: output }).await;

        let delivery = rx.recv().await.unwrap();
        let expected = out.path().join("samples").join("clip_sample.mp4");
        assert_eq!(delivery, Delivery::Saved { job_id: id, path: expected.clone() });
        assert_eq!(std::fs::read(expected).unwrap(), b"encoded");
    }

    #[tokio::test]
    async fn test_failures_are_forwarded() {
        let out = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = CliSink::new(Path::new("bad.avi"), out.path(), tx).quiet(true);
        let id = JobId::new();

        let failure = JobFailure::new(FailureKind::Probe, "Unsupported format: bad.avi");
        sink.on_complete(&id, JobOutcome::Failed(failure.clone())).await;
        assert_eq!(rx.recv().await.unwrap(), Delivery::Failed { job_id: id.clone(), failure });

        // output vanished before delivery
        sink.on_complete(&id, JobOutcome::Completed { output_path: out.path().join("missing.mp4") })
            .await;
        let delivery = rx.recv().await.unwrap();
        assert!(!delivery.is_saved());
    }
}
