//! Sample generation settings.
//!
//! Every knob the pipeline consults lives here; the planner and encoder never
//! fall back to constants of their own. Defaults mirror the production bot.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BitrateTable, EncodingConfig};

/// Default watermark text
pub const DEFAULT_WATERMARK_TEXT: &str = "Search ON TG @Linkz_Wallah";

/// Configuration error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Settings consumed by the planner and the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SampleConfig {
    /// Sources longer than this get the long sample
    pub long_video_threshold_secs: f64,
    /// Sample length for long sources
    pub long_video_sample_secs: f64,
    /// Sample length for everything else
    pub short_video_sample_secs: f64,
    /// Text burned into the sample
    pub watermark_text: String,
    /// Watermark text opacity (0.0 to 1.0)
    pub watermark_opacity: f32,
    /// Font size as a fraction of the shorter frame side
    pub watermark_scale: f64,
    /// Codec/preset/CRF/audio settings
    pub encoding: EncodingConfig,
    /// Resolution → bitrate tiers
    pub bitrate_tiers: BitrateTable,
    /// Minimum fraction change before a progress update is forwarded
    pub progress_step: f64,
    /// Wall-clock limit for one encoder run
    pub encode_timeout_secs: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            long_video_threshold_secs: 120.0,
            long_video_sample_secs: 30.0,
            short_video_sample_secs: 10.0,
            watermark_text: DEFAULT_WATERMARK_TEXT.to_string(),
            watermark_opacity: 0.6,
            watermark_scale: 0.04,
            encoding: EncodingConfig::default(),
            bitrate_tiers: BitrateTable::default(),
            progress_step: 0.05,
            encode_timeout_secs: 900,
        }
    }
}

impl SampleConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup (`VSAMPLE_*` names).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());

        let mut encoding = defaults.encoding.clone();
        if let Some(preset) = lookup("VSAMPLE_PRESET") {
            encoding.preset = preset;
        }
        if let Some(crf) = lookup("VSAMPLE_CRF").and_then(|s| s.trim().parse().ok()) {
            encoding = encoding.with_crf(crf);
        }
        if let Some(codec) = lookup("VSAMPLE_VIDEO_CODEC") {
            encoding.codec = codec;
        }
        if let Some(bitrate) = lookup("VSAMPLE_AUDIO_BITRATE") {
            encoding.audio_bitrate = bitrate;
        }

        let bitrate_tiers = match lookup("VSAMPLE_BITRATE_TIERS") {
            Some(raw) => raw.parse()?,
            None => defaults.bitrate_tiers.clone(),
        };

        let config = Self {
            long_video_threshold_secs: parsed("VSAMPLE_LONG_THRESHOLD_SECS")
                .unwrap_or(defaults.long_video_threshold_secs),
            long_video_sample_secs: parsed("VSAMPLE_LONG_SAMPLE_SECS")
                .unwrap_or(defaults.long_video_sample_secs),
            short_video_sample_secs: parsed("VSAMPLE_SHORT_SAMPLE_SECS")
                .unwrap_or(defaults.short_video_sample_secs),
            watermark_text: lookup("VSAMPLE_WATERMARK_TEXT").unwrap_or(defaults.watermark_text),
            watermark_opacity: parsed("VSAMPLE_WATERMARK_OPACITY")
                .map(|v| v as f32)
                .unwrap_or(defaults.watermark_opacity),
            watermark_scale: parsed("VSAMPLE_WATERMARK_SCALE").unwrap_or(defaults.watermark_scale),
            encoding,
            bitrate_tiers,
            progress_step: parsed("VSAMPLE_PROGRESS_STEP").unwrap_or(defaults.progress_step),
            encode_timeout_secs: lookup("VSAMPLE_ENCODE_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.encode_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.long_video_sample_secs.is_finite() && self.long_video_sample_secs > 0.0) {
            return Err(ConfigError::invalid("long_video_sample_secs", "must be positive and finite"));
        }
        if !(self.short_video_sample_secs.is_finite() && self.short_video_sample_secs > 0.0) {
            return Err(ConfigError::invalid("short_video_sample_secs", "must be positive and finite"));
        }
        if !(self.long_video_threshold_secs.is_finite() && self.long_video_threshold_secs >= 0.0) {
            return Err(ConfigError::invalid(
                "long_video_threshold_secs",
                "must be finite and not negative",
            ));
        }
        if !(self.progress_step > 0.0 && self.progress_step <= 1.0) {
            return Err(ConfigError::invalid("progress_step", "must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.watermark_opacity) {
            return Err(ConfigError::invalid("watermark_opacity", "must be in [0, 1]"));
        }
        if !(self.watermark_scale > 0.0 && self.watermark_scale < 1.0) {
            return Err(ConfigError::invalid("watermark_scale", "must be in (0, 1)"));
        }
        if self.encode_timeout_secs == 0 {
            return Err(ConfigError::invalid("encode_timeout_secs", "must be positive"));
        }
        Ok(())
    }
}
