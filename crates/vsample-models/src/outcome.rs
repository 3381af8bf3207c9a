//! Terminal job outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Source unreadable, corrupt, unsupported or without a usable duration
    Probe,
    /// Encoder exited non-zero or produced no output
    Encode,
    /// Encoder exceeded the wall-clock limit
    Timeout,
    /// Scratch directory could not be prepared
    Workspace,
    /// Anything unexpected, including a panic inside the job
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Probe => "probe",
            FailureKind::Encode => "encode",
            FailureKind::Timeout => "timeout",
            FailureKind::Workspace => "workspace",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed failure reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobFailure {
    pub kind: FailureKind,
    /// Human-readable reason
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for JobFailure {}

/// Final result delivered exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { output_path: PathBuf },
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match self {
            JobOutcome::Completed { output_path } => Some(output_path),
            JobOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            JobOutcome::Completed { .. } => None,
            JobOutcome::Failed(failure) => Some(failure),
        }
    }
}

impl From<Result<PathBuf, JobFailure>> for JobOutcome {
    fn from(result: Result<PathBuf, JobFailure>) -> Self {
        match result {
            Ok(output_path) => JobOutcome::Completed { output_path },
            Err(failure) => JobOutcome::Failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let ok: JobOutcome = Ok(PathBuf::from("/tmp/sample.mp4")).into();
        assert!(ok.is_success());
        assert_eq!(ok.output_path(), Some(&PathBuf::from("/tmp/sample.mp4")));

        let err: JobOutcome = Err(JobFailure::new(FailureKind::Probe, "corrupt")).into();
        assert!(!err.is_success());
        assert_eq!(err.failure().map(|f| f.kind), Some(FailureKind::Probe));
    }

    #[test]
    fn test_failure_display() {
        let failure = JobFailure::new(FailureKind::Timeout, "took too long");
        assert_eq!(failure.to_string(), "timeout error: took too long");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = JobOutcome::Failed(JobFailure::new(FailureKind::Encode, "exit 1"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "encode");
    }
}
