//! Single-worker job queue for sample encoding.
//!
//! This crate provides:
//! - FIFO admission that never blocks the caller
//! - One worker task processing jobs sequentially
//! - Per-job workspaces removed after every job
//! - Panic isolation between jobs
//! - Progress and completion delivery through [`JobSink`]

pub mod error;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod sink;

pub use error::{QueueError, QueueResult};
pub use job::{JobContext, JobProcessor, Submission};
pub use queue::{JobQueue, QueueConfig};
pub use sink::{ChannelSink, JobEvent, JobSink};
