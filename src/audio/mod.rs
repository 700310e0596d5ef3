pub mod extract;
pub mod merge;

pub use extract::{check_ffmpeg, Ffmpeg, MediaTool};
pub use merge::merge_intervals;

use crate::error::{CondenseError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A span of the media timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Get the duration of this interval.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Merge and padding policy shared by every job in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Largest gap between two intervals that still joins them.
    pub join_secs: f64,
    /// Seconds added before each interval.
    pub pre_pad: f64,
    /// Seconds added after each interval.
    pub post_pad: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            join_secs: 2.0,
            pre_pad: 0.0,
            post_pad: 0.0,
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if !self.join_secs.is_finite() || self.join_secs < 0.0 {
            return Err(CondenseError::Config(format!(
                "Join threshold must be a non-negative number of seconds, got {}",
                self.join_secs
            )));
        }

        if !self.pre_pad.is_finite() || !self.post_pad.is_finite() {
            return Err(CondenseError::Config(format!(
                "Padding must be finite, got pre={} post={}",
                self.pre_pad, self.post_pad
            )));
        }

        Ok(())
    }

    /// Compute the padded extraction window for an interval.
    ///
    /// The seek offset is clamped at zero; the duration is not, so extreme
    /// negative padding can produce a window that cannot be extracted.
    pub fn window(&self, interval: &Interval) -> ClipWindow {
        ClipWindow {
            start: (interval.start - self.pre_pad).max(0.0),
            duration: interval.duration() + self.pre_pad + self.post_pad,
        }
    }
}

/// Seek offset and length handed to the clip extractor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start: f64,
    pub duration: f64,
}

/// An extracted intermediate audio segment.
#[derive(Debug, Clone)]
pub struct Segment {
    pub window: ClipWindow,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_window_clamps_start() {
        let options = Options {
            join_secs: 1.0,
            pre_pad: 0.5,
            post_pad: 0.3,
        };
        let window = options.window(&Interval::new(0.2, 2.0));

        assert_eq!(window.start, 0.0);
        assert!(approx(window.duration, 2.6));
    }

    #[test]
    fn test_window_without_clamping() {
        let options = Options {
            join_secs: 0.0,
            pre_pad: 1.0,
            post_pad: 0.0,
        };
        let window = options.window(&Interval::new(10.0, 12.0));

        assert!(approx(window.start, 9.0));
        assert!(approx(window.duration, 3.0));
    }

    #[test]
    fn test_negative_padding_can_invert_window() {
        let options = Options {
            join_secs: 0.0,
            pre_pad: -1.0,
            post_pad: -1.0,
        };
        let window = options.window(&Interval::new(5.0, 6.0));

        assert!(window.duration < 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(Options::default().validate().is_ok());

        let negative_join = Options {
            join_secs: -0.1,
            ..Options::default()
        };
        assert!(negative_join.validate().is_err());

        let nan_pad = Options {
            pre_pad: f64::NAN,
            ..Options::default()
        };
        assert!(nan_pad.validate().is_err());
    }
}
