// Job planning from file patterns such as `shows/Episode *.mkv`

use crate::error::{CondenseError, Result};
use crate::pipeline::Job;
use crate::subtitle::locate_companion_subtitle;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const WILDCARD: char = '*';

/// A single-wildcard file name pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Wildcard {
    dir: PathBuf,
    prefix: String,
    suffix: String,
}

impl Wildcard {
    /// Split `pattern`; `None` unless its file name holds exactly one `*`.
    fn parse(pattern: &str) -> Option<Self> {
        if pattern.matches(WILDCARD).count() != 1 {
            return None;
        }

        let path = Path::new(pattern);
        let file_name = path.file_name()?.to_str()?;
        let (prefix, suffix) = file_name.split_once(WILDCARD)?;

        let dir = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };

        Some(Self {
            dir,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// The part of `file_name` standing in for the `*`.
    fn capture<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        if file_name.len() < self.prefix.len() + self.suffix.len() {
            return None;
        }
        file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())
    }
}

/// List the files matched by `pattern`, naturally sorted.
///
/// Without a `*` the pattern names a single file. Patterns with more than
/// one `*`, or a `*` outside the file name, match nothing.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    match pattern.matches(WILDCARD).count() {
        0 => {
            let path = PathBuf::from(pattern);
            Ok(if path.is_file() { vec![path] } else { Vec::new() })
        }
        1 => {
            let Some(wildcard) = Wildcard::parse(pattern) else {
                return Ok(Vec::new());
            };

            let mut files = Vec::new();
            for entry in std::fs::read_dir(&wildcard.dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                let matched = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| wildcard.capture(name))
                    .is_some();
                if matched {
                    files.push(path);
                }
            }

            natural_sort(&mut files);
            debug!("Pattern {} matched {} file(s)", pattern, files.len());
            Ok(files)
        }
        _ => Ok(Vec::new()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Text(String),
    /// Digit count without leading zeros, then the digits.
    Number(usize, String),
}

fn digit_runs() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit regex"))
}

/// Alternating text and number parts, always starting and ending with text.
fn natural_key(text: &str) -> Vec<KeyPart> {
    let mut key = Vec::new();
    let mut last = 0;

    for digits in digit_runs().find_iter(text) {
        key.push(KeyPart::Text(text[last..digits.start()].to_lowercase()));
        let trimmed = digits.as_str().trim_start_matches('0');
        key.push(KeyPart::Number(trimmed.len(), trimmed.to_string()));
        last = digits.end();
    }
    key.push(KeyPart::Text(text[last..].to_lowercase()));

    key
}

/// Compare strings so that embedded numbers order numerically.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Sort paths case-insensitively with embedded numbers ordered numerically.
pub fn natural_sort(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|path| natural_key(&path.to_string_lossy()));
}

/// Fill an output pattern for one media file.
fn output_for(output_pattern: &str, media_pattern: Option<&Wildcard>, media: &Path) -> String {
    let fill = media
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| media_pattern.and_then(|w| w.capture(name)))
        .map(str::to_string)
        .unwrap_or_else(|| {
            media
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    output_pattern.replacen(WILDCARD, &fill, 1)
}

/// Pair media files with subtitles and outputs.
///
/// Without a subtitle pattern each media file must have a companion
/// subtitle beside it.  The output pattern's `*` is filled with whatever the
/// media pattern's `*` matched.
pub fn plan_jobs(
    media_pattern: &str,
    subtitle_pattern: Option<&str>,
    output_pattern: &str,
) -> Result<Vec<Job>> {
    let media_files = expand_pattern(media_pattern)?;
    if media_files.is_empty() {
        return Err(CondenseError::Config(format!(
            "No media input files found for '{media_pattern}'"
        )));
    }

    let subtitle_files = match subtitle_pattern.map(str::trim).filter(|p| !p.is_empty()) {
        Some(pattern) => expand_pattern(pattern)?,
        None => media_files
            .iter()
            .map(|media| {
                locate_companion_subtitle(media).ok_or_else(|| {
                    CondenseError::Config(format!(
                        "No subtitle file was found for {}",
                        media.display()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?,
    };

    let output_files: Vec<PathBuf> = match output_pattern.matches(WILDCARD).count() {
        0 => vec![PathBuf::from(output_pattern)],
        1 => {
            let media_wildcard = Wildcard::parse(media_pattern);
            media_files
                .iter()
                .map(|media| PathBuf::from(output_for(output_pattern, media_wildcard.as_ref(), media)))
                .collect()
        }
        _ => {
            return Err(CondenseError::Config(format!(
                "The output path '{output_pattern}' is invalid, use at most one '*'"
            )))
        }
    };

    if media_files.len() != subtitle_files.len() {
        return Err(CondenseError::Config(format!(
            "Matching media files with subtitle files failed ({} media, {} subtitles)",
            media_files.len(),
            subtitle_files.len()
        )));
    }

    if media_files.len() != output_files.len() {
        return Err(CondenseError::Config(format!(
            "Matching media files with output files failed ({} media, {} outputs); use '*' in the output path",
            media_files.len(),
            output_files.len()
        )));
    }

    Ok(media_files
        .into_iter()
        .zip(subtitle_files)
        .zip(output_files)
        .map(|((media, subtitle), output)| Job::new(media, subtitle, output))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("ep2", "ep10"), Ordering::Less);
        assert_eq!(natural_cmp("Ep10", "ep9"), Ordering::Greater);
        assert_eq!(natural_cmp("ep007", "ep7"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "B"), Ordering::Less);
        assert_eq!(natural_cmp("10", "9a"), Ordering::Greater);
    }

    #[test]
    fn test_natural_sort_paths() {
        let mut paths: Vec<PathBuf> = ["x/Ep 10.mkv", "x/ep 2.mkv", "x/Ep 1.mkv"]
            .iter()
            .map(PathBuf::from)
            .collect();
        natural_sort(&mut paths);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("x/Ep 1.mkv"),
                PathBuf::from("x/ep 2.mkv"),
                PathBuf::from("x/Ep 10.mkv")
            ]
        );
    }

    #[test]
    fn test_wildcard_parse() {
        let w = Wildcard::parse("shows/Ep *.mkv").unwrap();
        assert_eq!(w.dir, PathBuf::from("shows"));
        assert_eq!(w.prefix, "Ep ");
        assert_eq!(w.suffix, ".mkv");

        let bare = Wildcard::parse("*.mkv").unwrap();
        assert_eq!(bare.dir, PathBuf::from("."));

        assert!(Wildcard::parse("sh*ws/ep.mkv").is_none());
        assert!(Wildcard::parse("a*b*c").is_none());
        assert!(Wildcard::parse("plain.mkv").is_none());
    }

    #[test]
    fn test_wildcard_capture() {
        let w = Wildcard::parse("Ep *.mkv").unwrap();
        assert_eq!(w.capture("Ep 01.mkv"), Some("01"));
        assert_eq!(w.capture("Ep .mkv"), Some(""));
        assert_eq!(w.capture("Ep 01.mp4"), None);
        assert_eq!(w.capture("Ep.mkv"), None);
    }

    #[test]
    fn test_output_for() {
        let w = Wildcard::parse("in/Ep *.mkv").unwrap();
        assert_eq!(
            output_for("out/Show *.mp3", Some(&w), Path::new("in/Ep 03.mkv")),
            "out/Show 03.mp3"
        );
        assert_eq!(
            output_for("out/*.mp3", None, Path::new("in/movie.mkv")),
            "out/movie.mp3"
        );
    }

    #[test]
    fn test_expand_pattern_rejects_many_wildcards() {
        assert!(expand_pattern("/tmp/*/*.mkv").unwrap().is_empty());
        assert!(expand_pattern("/nonexistent/file.mkv").unwrap().is_empty());
    }
}
