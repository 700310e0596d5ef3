pub mod ass;
pub mod srt;
pub mod timecode;

pub use timecode::{format_timecode, parse_timecode};

use crate::audio::Interval;
use crate::error::{CondenseError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A single timed subtitle, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleEntry {
    /// The timing of this entry without its text.
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

impl std::fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            format_timecode(self.start),
            format_timecode(self.end),
            self.text
        )
    }
}

/// Supported subtitle document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Ass,
}

impl SubtitleFormat {
    /// All formats, in companion lookup priority order.
    pub const ALL: [SubtitleFormat; 2] = [SubtitleFormat::Srt, SubtitleFormat::Ass];

    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Ass => "ass",
        }
    }

    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        Self::ALL
            .into_iter()
            .find(|format| format.extension() == ext)
            .ok_or_else(|| {
                CondenseError::UnsupportedFormat(format!(
                    "{} (expected .srt or .ass)",
                    path.display()
                ))
            })
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Lazy, single-pass sequence of subtitle entries read from a document.
pub enum Subtitles<R> {
    Srt(srt::SrtParser<R>),
    Ass(ass::AssParser<R>),
}

impl<R: BufRead> Subtitles<R> {
    pub fn from_reader(format: SubtitleFormat, reader: R) -> Self {
        match format {
            SubtitleFormat::Srt => Subtitles::Srt(srt::SrtParser::new(reader)),
            SubtitleFormat::Ass => Subtitles::Ass(ass::AssParser::new(reader)),
        }
    }
}

impl<R: BufRead> Iterator for Subtitles<R> {
    type Item = Result<SubtitleEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Subtitles::Srt(parser) => parser.next(),
            Subtitles::Ass(parser) => parser.next(),
        }
    }
}

/// Open a subtitle file, choosing the parser by extension.
pub fn parse_file(path: &Path) -> Result<Subtitles<BufReader<File>>> {
    let format = SubtitleFormat::from_path(path)?;

    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CondenseError::FileNotFound(path.display().to_string()),
        _ => CondenseError::Io(e),
    })?;

    Ok(Subtitles::from_reader(format, BufReader::new(file)))
}

/// Parse subtitles held in memory.
pub fn parse_str(format: SubtitleFormat, text: &str) -> Subtitles<&[u8]> {
    Subtitles::from_reader(format, text.as_bytes())
}

/// Find a subtitle file next to `media_path` sharing its base name.
pub fn locate_companion_subtitle(media_path: &Path) -> Option<PathBuf> {
    media_path.extension()?;

    SubtitleFormat::ALL
        .iter()
        .map(|format| media_path.with_extension(format.extension()))
        .find(|candidate| candidate.is_file())
}

/// Strip line terminators, trailing whitespace and a UTF-8 byte order mark.
pub(crate) fn clean_line(line: &str) -> &str {
    line.trim_start_matches('\u{feff}').trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SubtitleFormat::from_path(Path::new("a/b.srt")).unwrap(),
            SubtitleFormat::Srt
        );
        assert_eq!(
            SubtitleFormat::from_path(Path::new("b.ASS")).unwrap(),
            SubtitleFormat::Ass
        );
        assert!(matches!(
            SubtitleFormat::from_path(Path::new("b.vtt")),
            Err(CondenseError::UnsupportedFormat(_))
        ));
        assert!(SubtitleFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_parse_file_missing() {
        let result = parse_file(Path::new("/nonexistent/movie.srt"));
        assert!(matches!(result, Err(CondenseError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_file_unknown_extension_checked_first() {
        let result = parse_file(Path::new("/nonexistent/movie.sub"));
        assert!(matches!(result, Err(CondenseError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_companion_prefers_srt() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("movie.mp4");
        std::fs::write(&media, b"").unwrap();

        assert_eq!(locate_companion_subtitle(&media), None);

        std::fs::write(dir.path().join("movie.ass"), b"").unwrap();
        assert_eq!(
            locate_companion_subtitle(&media),
            Some(dir.path().join("movie.ass"))
        );

        std::fs::write(dir.path().join("movie.srt"), b"").unwrap();
        assert_eq!(
            locate_companion_subtitle(&media),
            Some(dir.path().join("movie.srt"))
        );
    }

    #[test]
    fn test_companion_requires_extension() {
        assert_eq!(locate_companion_subtitle(Path::new("/tmp/movie")), None);
    }

    #[test]
    fn test_entry_display() {
        let entry = SubtitleEntry {
            start: 1.5,
            end: 3.0,
            text: "Hi".to_string(),
        };
        assert_eq!(entry.to_string(), "0:00:01.500 0:00:03.000 Hi");
    }
}
