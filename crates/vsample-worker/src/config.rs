//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use vsample_models::SampleConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for per-job workspaces
    pub work_dir: PathBuf,
    /// Where finished samples are delivered
    pub output_dir: PathBuf,
    /// Move inputs into their workspace (they are deleted with it)
    pub consume_sources: bool,
    /// Prometheus listener; metrics are off when unset
    pub metrics_addr: Option<SocketAddr>,
    /// Sample planning and encoding settings
    pub sample: SampleConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("vsample"),
            output_dir: PathBuf::from("samples"),
            consume_sources: false,
            metrics_addr: None,
            sample: SampleConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let metrics_addr = match lookup("VSAMPLE_METRICS_ADDR") {
            Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|e| {
                WorkerError::config(format!("VSAMPLE_METRICS_ADDR '{}': {}", raw, e))
            })?),
            _ => None,
        };

        Ok(Self {
            work_dir: lookup("VSAMPLE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: lookup("VSAMPLE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            consume_sources: lookup("VSAMPLE_CONSUME_SOURCES")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.consume_sources),
            metrics_addr,
            sample: SampleConfig::from_lookup(&lookup)?,
        })
    }
}
