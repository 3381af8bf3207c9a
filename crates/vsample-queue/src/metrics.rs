//! Queue metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.

use metrics::{counter, gauge, histogram};

use vsample_models::FailureKind;

/// Metric names as constants for consistency.
pub mod names {
    pub const QUEUE_LENGTH: &str = "vsample_queue_length";
    pub const JOBS_ENQUEUED_TOTAL: &str = "vsample_jobs_enqueued_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vsample_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vsample_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "vsample_job_duration_seconds";
}

/// Update queue length gauge (queued plus active).
pub fn set_queue_length(length: usize) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

pub fn record_job_enqueued() {
    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "completed").record(duration_secs);
}

pub fn record_job_failed(kind: FailureKind, duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind.as_str()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "failed").record(duration_secs);
}
