//! Filesystem helpers for moving sources into workspaces.
//!
//! Workspaces may live on a different filesystem than the upload directory,
//! so a plain rename can fail with EXDEV; those moves fall back to copy and
//! delete.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Stem of a source once it has been moved into a workspace.
pub const ADOPTED_SOURCE_STEM: &str = "source";

/// Move `src` into `dir` as `source.<ext>`. Returns the new path.
///
/// The name never collides with [`SAMPLE_FILE_NAME`](crate::SAMPLE_FILE_NAME).
pub async fn adopt_file(src: impl AsRef<Path>, dir: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let src = src.as_ref();
    let name = match src.extension() {
        Some(ext) => format!("{}.{}", ADOPTED_SOURCE_STEM, ext.to_string_lossy()),
        None => ADOPTED_SOURCE_STEM.to_string(),
    };
    let dst = dir.as_ref().join(name);
    move_file(src, &dst).await?;
    Ok(dst)
}

/// Move a file from `src` to `dst`, creating the parent directory if needed.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !src.is_file() {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(src = %src.display(), dst = %dst.display(), "cross-device move, copying");
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Size of the file at `path`, or `None` when it is missing or not a file.
pub async fn file_len(path: impl AsRef<Path>) -> Option<u64> {
    match fs::metadata(path.as_ref()).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    // Stage next to dst so the final rename stays on one filesystem.
    let staged = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &staged).await {
        let _ = fs::remove_file(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staged, dst).await {
        let _ = fs::remove_file(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!(src = %src.display(), "source left behind after copy: {}", e);
    }

    Ok(())
}
