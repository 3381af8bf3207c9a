//! Sample processor and command-line front end.
//!
//! This crate provides:
//! - Worker configuration from the environment
//! - The probe, plan and encode processor run by the queue
//! - Tracing and metrics setup for the binaries

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod sink;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, JobLogger};
pub use processor::SampleProcessor;
pub use sink::{sample_file_name, CliSink, Delivery};
