//! FFmpeg command builder and runner.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::ProgressMonitor;

/// How long to wait for the stderr reader once the process has exited.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Progress lines go to stderr; everything else is limited to errors.
const LOG_LEVEL: &str = "error";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set target video bitrate.
    pub fn video_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:v").output_arg(bitrate)
    }

    /// Move the moov atom to the front so the file can stream.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Output file path.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        // Log level
        args.push("-v".to_string());
        args.push(LOG_LEVEL.to_string());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.push("-nostats".to_string());

        // Input args
        args.extend(self.input_args.clone());

        // Input file
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        // Output args
        args.extend(self.output_args.clone());

        // Output file
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking and a wall-clock limit.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Binary to execute
    program: PathBuf,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            timeout_secs: None,
        }
    }

    /// Use a specific ffmpeg binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command, feeding stderr through `monitor`.
    ///
    /// Forwarded fractions go to `progress_tx` in order. The monitor is handed
    /// back so the caller can emit the final update once the output is verified.
    pub async fn run_with_progress(
        &self,
        cmd: &FfmpegCommand,
        monitor: ProgressMonitor,
        progress_tx: mpsc::UnboundedSender<f64>,
    ) -> MediaResult<ProgressMonitor> {
        // Check FFmpeg exists
        which::which(&self.program).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.program.display(), args.join(" "));

        run_monitored(&self.program, &args, self.timeout_secs, monitor, progress_tx).await
    }
}

/// Spawn `program`, stream its stderr into `monitor`, enforce the timeout.
///
/// The child is spawned with kill-on-drop, so dropping this future also
/// terminates the process.
pub(crate) async fn run_monitored(
    program: impl AsRef<OsStr>,
    args: &[String],
    timeout_secs: Option<u64>,
    monitor: ProgressMonitor,
    progress_tx: mpsc::UnboundedSender<f64>,
) -> MediaResult<ProgressMonitor> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None))?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MediaError::internal("stderr not captured"))?;

    let mut reader_task = tokio::spawn(async move {
        let mut monitor = monitor;
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("stderr read failed: {}", e);
                    break;
                }
            }
            // Lines may carry non-UTF-8 file names.
            let line = String::from_utf8_lossy(&buf);
            if let Some(fraction) = monitor.observe_line(line.trim_end_matches(['\r', '\n'])) {
                // Receiver gone means nobody is listening; keep draining.
                let _ = progress_tx.send(fraction);
            }
        }
        monitor
    });

    let status = match wait_for_completion(&mut child, timeout_secs).await {
        Ok(status) => status,
        Err(e) => {
            reader_task.abort();
            return Err(e);
        }
    };

    let monitor = match tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut reader_task).await {
        Ok(Ok(monitor)) => Some(monitor),
        Ok(Err(e)) => {
            warn!("stderr reader failed: {}", e);
            None
        }
        Err(_) => {
            warn!("stderr reader did not finish after process exit");
            reader_task.abort();
            None
        }
    };

    if !status.success() {
        return Err(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            monitor.map(|m| m.stderr_tail()),
            status.code(),
        ));
    }

    monitor.ok_or_else(|| MediaError::internal("lost encoder progress state"))
}

/// Wait for child process with timeout; on expiry the process is killed and reaped.
async fn wait_for_completion(child: &mut Child, timeout_secs: Option<u64>) -> MediaResult<ExitStatus> {
    let Some(timeout_secs) = timeout_secs else {
        return Ok(child.wait().await?);
    };

    match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            // Timeout - kill the process
            warn!("FFmpeg timed out after {} seconds, killing process", timeout_secs);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out FFmpeg: {}", e);
            }
            Err(MediaError::Timeout(timeout_secs))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
