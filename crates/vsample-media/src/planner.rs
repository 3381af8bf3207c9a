//! Sample window, bitrate and watermark sizing.
//!
//! Planning is a pure function of the probed source and the configuration:
//! no I/O and no failure path.

use vsample_models::{SampleConfig, SamplePlan};

use crate::probe::VideoInfo;

/// Compute the sample plan for a probed source.
pub fn plan_sample(info: &VideoInfo, config: &SampleConfig) -> SamplePlan {
    plan(info.duration, info.width, info.height, config)
}

/// Compute the sample plan from raw duration and frame size.
///
/// `duration_secs` must be positive (the probe guarantees it).
pub fn plan(duration_secs: f64, width: u32, height: u32, config: &SampleConfig) -> SamplePlan {
    let (sample_start_seconds, sample_duration_seconds) = sample_window(duration_secs, config);

    SamplePlan {
        sample_start_seconds,
        sample_duration_seconds,
        target_bitrate_kbps: config.bitrate_tiers.lookup(width, height),
        watermark_text: config.watermark_text.clone(),
        watermark_font_size: watermark_font_size(width, height, config.watermark_scale),
        source_duration_seconds: duration_secs,
        source_width: width,
        source_height: height,
    }
}

/// Returns `(start, length)` of the sample in seconds.
///
/// Long sources get the long sample, everything else the short one; the
/// window is cut from the temporal middle. Sources no longer than the
/// target are sampled whole, truncated to whole seconds.
pub fn sample_window(duration_secs: f64, config: &SampleConfig) -> (f64, f64) {
    let target = if duration_secs > config.long_video_threshold_secs {
        config.long_video_sample_secs
    } else {
        config.short_video_sample_secs
    };

    if duration_secs <= target {
        // Sub-second sources keep their exact length so the window never overruns.
        let length = if duration_secs >= 1.0 {
            duration_secs.floor()
        } else {
            duration_secs
        };
        return (0.0, length);
    }

    let start = ((duration_secs - target) / 2.0).floor();
    (start, target)
}

/// Font size proportional to the shorter frame side, never below 1px.
pub fn watermark_font_size(width: u32, height: u32, scale: f64) -> u32 {
    let short_side = f64::from(width.min(height));
    ((short_side * scale).floor() as u32).max(1)
}
