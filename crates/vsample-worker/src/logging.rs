//! Tracing setup and structured job logging.

use std::path::Path;
use tracing::{error, info, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vsample_media::VideoInfo;
use vsample_models::{JobFailure, JobId, SamplePlan};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "vsample=info";

/// Initialize tracing: JSON when `LOG_FORMAT=json`, human-readable otherwise.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Structured log lines for one sample job.
///
/// Every line carries the job ID and the operation name.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, source: &Path) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            source = %source.display(),
            "Job started"
        );
    }

    pub fn log_probed(&self, info: &VideoInfo) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            duration_secs = info.duration,
            width = info.width,
            height = info.height,
            fps = info.fps,
            codec = %info.codec,
            "Source probed"
        );
    }

    pub fn log_plan(&self, plan: &SamplePlan) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            start_secs = plan.sample_start_seconds,
            duration_secs = plan.sample_duration_seconds,
            bitrate_kbps = plan.target_bitrate_kbps,
            font_size = plan.watermark_font_size,
            "Sample planned"
        );
    }

    pub fn log_failure(&self, failure: &JobFailure) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            kind = %failure.kind,
            "Job failed: {}", failure.message
        );
    }

    pub fn log_completion(&self, output: &Path, elapsed_secs: f64) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            output = %output.display(),
            elapsed_secs,
            "Job completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Tracing span carrying the job fields.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "sample_job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
