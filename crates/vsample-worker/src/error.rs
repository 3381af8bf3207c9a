//! Worker error types.

use thiserror::Error;

use vsample_media::MediaError;
use vsample_models::{ConfigError, FailureKind, JobFailure};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Probe failed: {0}")]
    Probe(#[source] MediaError),

    #[error("Encode failed: {0}")]
    Encode(#[source] MediaError),

    #[error(transparent)]
    Job(#[from] JobFailure),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] vsample_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for WorkerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Failure category reported to the caller.
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkerError::Probe(_) => FailureKind::Probe,
            WorkerError::Encode(e) if e.is_timeout() => FailureKind::Timeout,
            WorkerError::Encode(MediaError::Workspace(_)) => FailureKind::Workspace,
            WorkerError::Encode(_) => FailureKind::Encode,
            WorkerError::Job(failure) => failure.kind,
            _ => FailureKind::Internal,
        }
    }

    /// Convert into the typed failure delivered through the sink.
    pub fn into_failure(self) -> JobFailure {
        let kind = self.kind();
        match self {
            WorkerError::Job(failure) => failure,
            WorkerError::Probe(e) | WorkerError::Encode(e) => JobFailure::new(kind, e.detail()),
            other => JobFailure::new(kind, other.to_string()),
        }
    }
}
