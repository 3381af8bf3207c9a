//! FFmpeg CLI wrapper for sample generation.
//!
//! This crate provides:
//! - Source probing through `ffprobe`
//! - Sample planning (window, bitrate, watermark size)
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Per-job workspaces with guaranteed cleanup

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod planner;
pub mod probe;
pub mod progress;
pub mod sample;
pub mod watermark;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{adopt_file, move_file, ADOPTED_SOURCE_STEM};
pub use planner::{plan, plan_sample, sample_window, watermark_font_size};
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressMonitor};
pub use sample::{create_sample, create_sample_with, SAMPLE_FILE_NAME};
pub use watermark::{build_drawtext_filter, WatermarkConfig};
pub use workspace::{Workspace, WorkspaceManager};
