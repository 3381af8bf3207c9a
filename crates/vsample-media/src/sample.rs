//! Sample encoding.
//!
//! One encoder process per sample: seek to the planned start, cut the planned
//! length, burn in the watermark and write `sample.mp4` into the workspace.

use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::info;

use vsample_models::{SampleConfig, SamplePlan};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::file_len;
use crate::progress::ProgressMonitor;
use crate::watermark::{build_drawtext_filter, WatermarkConfig};

/// File name of the encoded sample inside the workspace.
pub const SAMPLE_FILE_NAME: &str = "sample.mp4";

/// Build the encoder command for `plan`.
pub fn build_sample_command(
    plan: &SamplePlan,
    source: &Path,
    output: &Path,
    config: &SampleConfig,
) -> FfmpegCommand {
    let watermark = WatermarkConfig::from_plan(plan).with_opacity(config.watermark_opacity);

    FfmpegCommand::new(source, output)
        .seek(plan.sample_start_seconds)
        .duration(plan.sample_duration_seconds)
        .video_filter(build_drawtext_filter(&watermark))
        .output_args(config.encoding.to_ffmpeg_args())
        .video_bitrate(plan.bitrate_arg())
        .faststart()
}

/// Encode the sample described by `plan` into `work_dir`.
///
/// Progress fractions are sent on `progress_tx` in order and never decrease.
/// On success the last value sent is `1.0`.
pub async fn create_sample(
    plan: &SamplePlan,
    source: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
    config: &SampleConfig,
    progress_tx: mpsc::UnboundedSender<f64>,
) -> MediaResult<PathBuf> {
    create_sample_with(&FfmpegRunner::new(), plan, source, work_dir, config, progress_tx).await
}

/// Same as [`create_sample`] with an explicit runner.
pub async fn create_sample_with(
    runner: &FfmpegRunner,
    plan: &SamplePlan,
    source: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
    config: &SampleConfig,
    progress_tx: mpsc::UnboundedSender<f64>,
) -> MediaResult<PathBuf> {
    let source = source.as_ref();
    let output = work_dir.as_ref().join(SAMPLE_FILE_NAME);

    info!(
        source = %source.display(),
        start = plan.sample_start_seconds,
        duration = plan.sample_duration_seconds,
        bitrate_kbps = plan.target_bitrate_kbps,
        "Encoding sample"
    );

    let cmd = build_sample_command(plan, source, &output, config);
    let runner = runner.clone().with_timeout(config.encode_timeout_secs);
    let monitor = ProgressMonitor::new(plan.sample_duration_seconds, config.progress_step);

    let mut monitor = runner
        .run_with_progress(&cmd, monitor, progress_tx.clone())
        .await?;

    match file_len(&output).await {
        Some(len) if len > 0 => {}
        _ => return Err(MediaError::MissingOutput(output)),
    }

    if let Some(fraction) = monitor.finish() {
        let _ = progress_tx.send(fraction);
    }

    info!(output = %output.display(), "Sample encoded");
    Ok(output)
}
