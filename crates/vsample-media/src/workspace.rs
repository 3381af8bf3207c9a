//! Per-job scratch directories.
//!
//! Every job gets a fresh `job-*` directory under the configured root. The
//! directory is removed recursively when the [`Workspace`] is closed or
//! dropped, whichever comes first.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use vsample_models::JobId;

use crate::error::{MediaError, MediaResult};

/// Prefix shared by all workspace directories.
pub const WORKSPACE_PREFIX: &str = "job-";

/// Allocates workspaces under a root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspaces under the system temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("vsample"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a uniquely named directory for `job_id`.
    pub fn acquire(&self, job_id: &JobId) -> MediaResult<Workspace> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            MediaError::workspace(format!("cannot create {}: {}", self.root.display(), e))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", WORKSPACE_PREFIX, job_id))
            .tempdir_in(&self.root)
            .map_err(|e| {
                MediaError::workspace(format!(
                    "cannot allocate workspace in {}: {}",
                    self.root.display(),
                    e
                ))
            })?;

        debug!(job_id = %job_id, path = %dir.path().display(), "Workspace acquired");

        Ok(Workspace {
            job_id: job_id.clone(),
            dir,
        })
    }

    /// Remove `job-*` directories left behind by a previous run.
    ///
    /// Returns the number of directories removed. Individual failures are
    /// logged and skipped.
    pub fn sweep(&self) -> MediaResult<usize> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_workspace = path.is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(WORKSPACE_PREFIX));
            if !is_workspace {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), "Failed to remove stale workspace: {}", e),
            }
        }

        if removed > 0 {
            info!(root = %self.root.display(), removed, "Removed stale workspaces");
        }
        Ok(removed)
    }
}

/// A job's scratch directory. Deleted on [`close`](Workspace::close) or drop.
#[derive(Debug)]
pub struct Workspace {
    job_id: JobId,
    dir: TempDir,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Delete the directory, reporting any error.
    pub fn close(self) -> MediaResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            MediaError::workspace(format!("failed to remove {}: {}", path.display(), e))
        })?;
        debug!(job_id = %self.job_id, path = %path.display(), "Workspace removed");
        Ok(())
    }
}
