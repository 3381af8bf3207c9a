//! Probe, plan and encode one submitted video.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::Instrument;

use vsample_media::{create_sample_with, plan_sample, probe_video, FfmpegRunner};
use vsample_models::{JobFailure, JobState, SampleConfig};
use vsample_queue::{JobContext, JobProcessor};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// The media pipeline behind the queue.
#[derive(Debug, Clone)]
pub struct SampleProcessor {
    config: Arc<SampleConfig>,
    runner: FfmpegRunner,
}

impl SampleProcessor {
    pub fn new(config: SampleConfig) -> Self {
        Self {
            config: Arc::new(config),
            runner: FfmpegRunner::new(),
        }
    }

    /// Use a specific ffmpeg binary.
    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    async fn run(&self, ctx: &JobContext, logger: &JobLogger) -> WorkerResult<PathBuf> {
        // The queue has already moved the job to Probing.
        let info = probe_video(ctx.source()).await.map_err(WorkerError::Probe)?;
        logger.log_probed(&info);

        ctx.advance(JobState::Planning).await?;
        let plan = plan_sample(&info, &self.config);
        logger.log_plan(&plan);
        ctx.set_plan(plan.clone()).await?;

        ctx.advance(JobState::Encoding).await?;
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let encode = create_sample_with(
            &self.runner,
            &plan,
            ctx.source(),
            ctx.work_dir(),
            &self.config,
            progress_tx,
        );
        // Ends once the encoder side drops its sender.
        let forward = async {
            while let Some(fraction) = progress_rx.recv().await {
                ctx.report_progress(fraction).await;
            }
        };

        let (output, ()) = tokio::join!(encode, forward);
        output.map_err(WorkerError::Encode)
    }
}

#[async_trait]
impl JobProcessor for SampleProcessor {
    async fn process(&self, ctx: JobContext) -> Result<PathBuf, JobFailure> {
        let logger = JobLogger::new(ctx.job_id(), "sample");
        let started = Instant::now();

        async {
            logger.log_start(ctx.source());
            match self.run(&ctx, &logger).await {
                Ok(output) => {
                    logger.log_completion(&output, started.elapsed().as_secs_f64());
                    Ok(output)
                }
                Err(e) => {
                    let failure = e.into_failure();
                    logger.log_failure(&failure);
                    Err(failure)
                }
            }
        }
        .instrument(logger.create_span())
        .await
    }
}
