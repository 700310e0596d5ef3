// Timecode conversion

use crate::error::{CondenseError, Result};

/// Parse a `[[HH:]MM:]SS[.ms]` timecode into seconds.
///
/// Both `,` and `.` are accepted as the decimal separator, so SubRip
/// (`00:00:01,500`) and ASS (`0:00:01.50`) timings parse the same way.
pub fn parse_timecode(text: &str) -> Result<f64> {
    let normalized = text.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    if !(1..=3).contains(&parts.len()) {
        return Err(CondenseError::Format(text.to_string()));
    }

    let mut secs = 0.0;
    for (unit, part) in parts.iter().rev().enumerate() {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| CondenseError::Format(text.to_string()))?;
        if !value.is_finite() {
            return Err(CondenseError::Format(text.to_string()));
        }
        secs += value * 60f64.powi(unit as i32);
    }

    Ok(secs)
}

/// Format seconds as `H:MM:SS.mmm`.
pub fn format_timecode(secs: f64) -> String {
    let sign = if secs < 0.0 { "-" } else { "" };
    let total_ms = (secs.abs() * 1000.0).round() as u64;

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{sign}{hours}:{minutes:02}:{seconds:02}.{millis:03}")
}
