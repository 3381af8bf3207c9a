//! Shared data models for the vsample pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job states and status snapshots
//! - Sample plans and the configuration they are derived from
//! - Encoding settings and bitrate tiers
//! - Terminal outcomes and failure kinds

pub mod bitrate;
pub mod encoding;
pub mod job;
pub mod outcome;
pub mod plan;
pub mod sample_config;
pub mod utils;

// Re-export common types
pub use bitrate::{BitrateTable, BitrateTier};
pub use encoding::EncodingConfig;
pub use job::{JobId, JobState, JobStatus, OwnerRef};
pub use outcome::{FailureKind, JobFailure, JobOutcome};
pub use plan::SamplePlan;
pub use sample_config::{ConfigError, SampleConfig, DEFAULT_WATERMARK_TEXT};
pub use utils::{format_progress_bar, is_supported_format, SUPPORTED_FORMATS};
