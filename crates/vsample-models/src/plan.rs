//! Sample plan produced by the planner.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything the encoder needs to cut and watermark one sample.
///
/// Computed once per job from the probed source and the active
/// [`SampleConfig`](crate::SampleConfig); never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SamplePlan {
    /// Offset into the source where the sample starts (seconds)
    pub sample_start_seconds: f64,

    /// Length of the sample (seconds)
    pub sample_duration_seconds: f64,

    /// Target video bitrate in kbps
    pub target_bitrate_kbps: u32,

    /// Text burned into every frame
    pub watermark_text: String,

    /// Font size in pixels for the watermark text
    pub watermark_font_size: u32,

    /// Source duration the plan was derived from (seconds)
    pub source_duration_seconds: f64,

    /// Source frame width in pixels
    pub source_width: u32,

    /// Source frame height in pixels
    pub source_height: u32,
}

impl SamplePlan {
    /// End of the sample window in source time.
    pub fn sample_end_seconds(&self) -> f64 {
        self.sample_start_seconds + self.sample_duration_seconds
    }

    /// Bitrate formatted for FFmpeg (`-b:v 2000k`).
    pub fn bitrate_arg(&self) -> String {
        format!("{}k", self.target_bitrate_kbps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_end_and_bitrate_arg() {
        let plan = SamplePlan {
            sample_start_seconds: 60.0,
            sample_duration_seconds: 30.0,
            target_bitrate_kbps: 2000,
            watermark_text: "wm".to_string(),
            watermark_font_size: 43,
            source_duration_seconds: 150.0,
            source_width: 1920,
            source_height: 1080,
        };

        assert!((plan.sample_end_seconds() - 90.0).abs() < f64::EPSILON);
        assert_eq!(plan.bitrate_arg(), "2000k");
    }
}
