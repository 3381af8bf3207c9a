//! Small helpers shared by the front end and the worker.

use std::path::Path;

/// Container extensions accepted for submission (lowercase, no dot).
pub const SUPPORTED_FORMATS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov", "flv", "m4v"];

/// Check whether a file name carries an accepted container extension.
pub fn is_supported_format(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_FORMATS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Render a text progress bar such as `████░░░░░░ 40%`.
pub fn format_progress_bar(fraction: f64, length: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((fraction * length as f64) as usize).min(length);
    let percent = (fraction * 100.0) as u32;
    format!(
        "{}{} {}%",
        "█".repeat(filled),
        "░".repeat(length - filled),
        percent
    )
}
