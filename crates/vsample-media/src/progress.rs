//! FFmpeg progress parsing.
//!
//! FFmpeg's `-progress` output is a stream of `key=value` lines, one block per
//! update, terminated by `progress=continue` or `progress=end`. The
//! [`ProgressMonitor`] turns the encoded-time markers into a fraction of the
//! sample length and decides which fractions are worth forwarding.

use std::collections::VecDeque;

/// Number of non-progress stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// Latest encoded position reported by FFmpeg.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    /// Encoded output time in microseconds
    pub out_time_us: i64,
}

impl FfmpegProgress {
    /// Encoded output time in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_us as f64 / 1_000_000.0
    }
}

/// Kind of line seen on the encoder's stderr.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// An encoded-time marker was updated
    Time,
    /// Some other `-progress` key (frame, fps, speed, ...)
    Other,
    /// Not part of the progress protocol (warnings, errors)
    Log,
}

/// Apply one line of `-progress` output to `current`.
///
/// `out_time_ms` carries microseconds despite its name, so both it and
/// `out_time_us` are read as microseconds. Negative and `N/A` values, which
/// FFmpeg emits before the first frame, are ignored.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> ProgressLine {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return ProgressLine::Log;
    };
    let value = value.trim();

    match key {
        "out_time_us" | "out_time_ms" => match value.parse::<i64>() {
            Ok(us) if us >= 0 => {
                current.out_time_us = us;
                ProgressLine::Time
            }
            _ => ProgressLine::Other,
        },
        "out_time" => match parse_clock(value) {
            Some(secs) => {
                current.out_time_us = (secs * 1_000_000.0) as i64;
                ProgressLine::Time
            }
            None => ProgressLine::Other,
        },
        "frame" | "fps" | "speed" | "bitrate" | "total_size" | "dup_frames" | "drop_frames"
        | "progress" => ProgressLine::Other,
        k if k.starts_with("stream_") => ProgressLine::Other,
        _ => ProgressLine::Log,
    }
}

/// Parse `HH:MM:SS.ffffff` into seconds.
fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || h < 0.0 || m < 0.0 || s < 0.0 {
        return None;
    }
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Converts encoder output into rate-limited, non-decreasing fractions.
#[derive(Debug)]
pub struct ProgressMonitor {
    sample_duration_secs: f64,
    step: f64,
    last_forwarded: f64,
    current: FfmpegProgress,
    stderr_tail: VecDeque<String>,
}

impl ProgressMonitor {
    /// `step` is the minimum increase before a new fraction is forwarded.
    pub fn new(sample_duration_secs: f64, step: f64) -> Self {
        Self {
            sample_duration_secs,
            step,
            last_forwarded: 0.0,
            current: FfmpegProgress::default(),
            stderr_tail: VecDeque::with_capacity(STDERR_TAIL_LINES),
        }
    }

    /// Feed one stderr line; returns the fraction to forward, if any.
    pub fn observe_line(&mut self, line: &str) -> Option<f64> {
        match parse_progress_line(line, &mut self.current) {
            ProgressLine::Time => self.consider(self.current.out_time_secs()),
            ProgressLine::Other => None,
            ProgressLine::Log => {
                let line = line.trim();
                if !line.is_empty() {
                    if self.stderr_tail.len() == STDERR_TAIL_LINES {
                        self.stderr_tail.pop_front();
                    }
                    self.stderr_tail.push_back(line.to_string());
                }
                None
            }
        }
    }

    fn consider(&mut self, encoded_secs: f64) -> Option<f64> {
        if self.sample_duration_secs <= 0.0 {
            return None;
        }
        let fraction = (encoded_secs / self.sample_duration_secs).clamp(0.0, 1.0);
        // Small epsilon so 0.05 steps are not lost to float rounding.
        if fraction - self.last_forwarded >= self.step - 1e-9 && fraction > self.last_forwarded {
            self.last_forwarded = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    /// Final update after a successful encode: `1.0` unless already forwarded.
    pub fn finish(&mut self) -> Option<f64> {
        if self.last_forwarded < 1.0 {
            self.last_forwarded = 1.0;
            Some(1.0)
        } else {
            None
        }
    }

    /// Last fraction handed out.
    pub fn last_forwarded(&self) -> f64 {
        self.last_forwarded
    }

    /// Non-progress stderr lines (most recent last), joined by newlines.
    pub fn stderr_tail(&self) -> String {
        self.stderr_tail
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
