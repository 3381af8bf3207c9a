//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Encoder produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a workspace error.
    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a wall-clock timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MediaError::Timeout(_))
    }

    /// Short, user-facing description including the tail of the encoder log if present.
    pub fn detail(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                message,
                stderr: Some(stderr),
                exit_code,
            } if !stderr.trim().is_empty() => {
                let code = exit_code.map(|c| format!(" (exit {c})")).unwrap_or_default();
                format!("{message}{code}: {}", stderr.trim())
            }
            MediaError::FfprobeFailed {
                message,
                stderr: Some(stderr),
            } if !stderr.trim().is_empty() => format!("{message}: {}", stderr.trim()),
            other => other.to_string(),
        }
    }
}
