//! Centered text watermark burned into every frame.
//!
//! # Architecture
//!
//! - `WatermarkConfig`: Builder pattern for the drawtext settings
//! - `build_drawtext_filter`: renders the FFmpeg `-vf` expression

use vsample_models::SamplePlan;

/// Default border width around glyphs (pixels)
pub const DEFAULT_BORDER_WIDTH: u32 = 2;

/// Configuration for the text watermark.
///
/// ```ignore
/// let config = WatermarkConfig::new("preview", 43).with_opacity(0.6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    /// Text to draw
    pub text: String,
    /// Font size in pixels
    pub font_size: u32,
    /// Text opacity (0.0 to 1.0)
    pub opacity: f32,
    /// Border width in pixels
    pub border_width: u32,
    /// Border opacity (0.0 to 1.0)
    pub border_opacity: f32,
}

impl WatermarkConfig {
    pub fn new(text: impl Into<String>, font_size: u32) -> Self {
        Self {
            text: text.into(),
            font_size: font_size.max(1),
            opacity: 0.6,
            border_width: DEFAULT_BORDER_WIDTH,
            border_opacity: 0.8,
        }
    }

    /// Take text and size from a plan.
    pub fn from_plan(plan: &SamplePlan) -> Self {
        Self::new(plan.watermark_text.clone(), plan.watermark_font_size)
    }

    /// Set text opacity (0.0 = invisible, 1.0 = fully opaque).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// Render the `text` option value.
///
/// FFmpeg unescapes the value three times (graph, option list, `%{...}`
/// expansion), so it is escaped innermost first. Backslashes are literal
/// inside single quotes; an apostrophe closes the quote, is escaped, and
/// reopens it.
fn escape_drawtext(text: &str) -> String {
    let expanded = text.replace('\\', "\\\\").replace('%', "\\%");
    let option = format!("'{}'", expanded.replace('\'', r"'\''"));
    escape_graph(&option)
}

/// Backslash-escape the characters the filtergraph parser treats specially.
fn escape_graph(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build the drawtext filter that centers the text in the frame.
pub fn build_drawtext_filter(config: &WatermarkConfig) -> String {
    format!(
        "drawtext=text={}:fontsize={}:fontcolor=white@{:.2}:borderw={}:bordercolor=black@{:.2}:x=(w-text_w)/2:y=(h-text_h)/2",
        escape_drawtext(&config.text),
        config.font_size,
        config.opacity,
        config.border_width,
        config.border_opacity,
    )
}
