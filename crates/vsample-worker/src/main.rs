//! `vsample`: create watermarked preview samples from local video files.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use vsample_media::{check_ffmpeg, check_ffprobe, WorkspaceManager};
use vsample_models::{is_supported_format, OwnerRef, SUPPORTED_FORMATS};
use vsample_queue::{JobQueue, QueueConfig};
use vsample_worker::{init_tracing, CliSink, Delivery, SampleProcessor, WorkerConfig};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Create short watermarked preview samples from video files",
    long_about = "Each file is probed, a 10 or 30 second window is cut from the middle, \
                  the watermark is burned in and the result is saved as <name>_sample.mp4. \
                  Files are processed one at a time in the order given."
)]
struct Cli {
    /// Video files to sample
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Directory for finished samples [default: VSAMPLE_OUTPUT_DIR or ./samples]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Root for per-job scratch directories [default: VSAMPLE_WORK_DIR or the system temp dir]
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Move inputs into the job workspace; they are deleted after processing
    #[arg(long, default_value_t = false)]
    consume: bool,

    /// Caller identity attached to the jobs
    #[arg(long, env = "VSAMPLE_OWNER", default_value = "cli")]
    owner: String,

    /// Only print the final summary
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = WorkerConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.work_dir {
        config.work_dir = dir;
    }
    config.consume_sources |= cli.consume;
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        vsample_worker::metrics::init_metrics(addr)?;
    }

    check_ffmpeg().context("ffmpeg is required")?;
    check_ffprobe().context("ffprobe is required")?;

    let workspaces = WorkspaceManager::new(&config.work_dir);
    if let Err(e) = workspaces.sweep() {
        warn!("Could not clean stale workspaces: {}", e);
    }

    let processor = Arc::new(SampleProcessor::new(config.sample.clone()));
    let queue = JobQueue::start(
        processor,
        workspaces,
        QueueConfig {
            adopt_source: config.consume_sources,
        },
    );

    let owner = OwnerRef::new(cli.owner);
    let (delivery_tx, mut delivery_rx) = mpsc::unbounded_channel();
    let mut rejected = 0usize;
    let mut submitted = 0usize;

    for file in &cli.files {
        if !is_supported_format(file) {
            rejected += 1;
            println!(
                "[{}] Unsupported format (accepted: {})",
                file.display(),
                SUPPORTED_FORMATS.join(", ")
            );
            continue;
        }

        let sink = CliSink::new(file, &config.output_dir, delivery_tx.clone()).quiet(cli.quiet);
        match queue.submit(file, owner.clone(), Arc::new(sink)).await {
            Ok(submission) => {
                submitted += 1;
                if !cli.quiet {
                    println!(
                        "[{}] Added to queue | Position: #{}",
                        file.display(),
                        submission.queue_position
                    );
                }
            }
            Err(e) => {
                rejected += 1;
                println!("[{}] Could not queue: {}", file.display(), e);
            }
        }
    }
    drop(delivery_tx);

    if !cli.quiet && submitted > 0 {
        println!("Videos in queue: {}", queue.len().await);
    }

    queue.shutdown().await;

    let mut saved = 0usize;
    let mut failed = rejected;
    while let Some(delivery) = delivery_rx.recv().await {
        match delivery {
            Delivery::Saved { .. } => saved += 1,
            Delivery::Failed { .. } => failed += 1,
        }
    }

    println!("{} sample(s) saved to {}, {} failed", saved, config.output_dir.display(), failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
