use crate::audio::{merge_intervals, Interval, MediaTool, Options, Segment};
use crate::error::{CondenseError, Result};
use crate::metadata::{OutputFormat, TagWriter};
use crate::subtitle::{format_timecode, parse_file, SubtitleEntry, SubtitleFormat};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

const MANIFEST_NAME: &str = "part_list.txt";
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// One media file to condense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub media_file: PathBuf,
    pub subtitle_file: PathBuf,
    pub output_file: PathBuf,
}

impl Job {
    pub fn new(
        media_file: impl Into<PathBuf>,
        subtitle_file: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            media_file: media_file.into(),
            subtitle_file: subtitle_file.into(),
            output_file: output_file.into(),
        }
    }

    /// Reject unknown subtitle or output formats before any work starts.
    pub fn check_formats(&self) -> Result<()> {
        SubtitleFormat::from_path(&self.subtitle_file)?;
        OutputFormat::from_path(&self.output_file)?;
        Ok(())
    }
}

/// Position of the pipeline within a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub job_index: usize,
    pub num_jobs: usize,
    pub segment_index: usize,
    pub num_segments: usize,
}

impl Progress {
    /// Fraction of the batch completed before this segment, in `[0, 1)`.
    pub fn fraction(&self) -> f64 {
        if self.num_jobs == 0 {
            return 0.0;
        }
        let jobs = self.num_jobs as f64;
        let mut fraction = self.job_index as f64 / jobs;
        if self.num_segments > 0 {
            fraction += self.segment_index as f64 / self.num_segments as f64 / jobs;
        }
        fraction
    }
}

/// Cooperative cancellation shared between the worker and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            tokio::time::sleep(CANCEL_POLL).await;
        }
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CondenseError::Cancelled);
        }
        Ok(())
    }
}

/// What a finished job produced.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub output_path: PathBuf,
    pub subtitle_entries: usize,
    pub segments: usize,
    /// Seconds of padded dialogue written to the output.
    pub audio_secs: f64,
    pub tagged: bool,
    pub elapsed: Duration,
}

/// Shared, read-only state a job runs with.
pub struct JobContext<'a> {
    pub tool: &'a dyn MediaTool,
    pub options: &'a Options,
    pub tags: &'a TagWriter,
    pub cancel: &'a CancelFlag,
}

/// Cleanup guard that logs removal of a job's temp directory when dropped.
struct TempCleanupGuard {
    temp_dir: Option<TempDir>,
    cancel: CancelFlag,
}

impl TempCleanupGuard {
    fn new(cancel: &CancelFlag) -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("condense").tempdir()?;
        debug!("Using temp directory: {:?}", temp_dir.path());
        Ok(Self {
            temp_dir: Some(temp_dir),
            cancel: cancel.clone(),
        })
    }

    fn path(&self) -> &Path {
        self.temp_dir
            .as_ref()
            .map(|dir| dir.path())
            .unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TempCleanupGuard {
    fn drop(&mut self) {
        if let Some(temp_dir) = self.temp_dir.take() {
            let path = temp_dir.path().to_path_buf();
            if self.cancel.is_cancelled() {
                warn!("Conversion cancelled, cleaning up temp files: {:?}", path);
            } else {
                debug!("Cleaning up temp directory: {:?}", path);
            }
            if let Err(e) = temp_dir.close() {
                warn!("Failed to remove temp directory {:?}: {e}", path);
            }
        }
    }
}

/// Parse a subtitle file and merge its timings.
///
/// Returns the number of subtitle entries alongside the merged intervals.
pub fn load_intervals(subtitle_file: &Path, join_secs: f64) -> Result<(usize, Vec<Interval>)> {
    let entries: Vec<SubtitleEntry> = parse_file(subtitle_file)?.collect::<Result<_>>()?;
    let intervals = merge_intervals(entries.iter().map(SubtitleEntry::interval), join_secs);
    Ok((entries.len(), intervals))
}

/// One manifest line for the concat demuxer.
pub fn manifest_line(path: &Path) -> String {
    let quoted = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{quoted}'")
}

/// Write the ordered segment list consumed by concatenation.
pub fn write_manifest(segments: &[Segment], manifest: &Path) -> Result<()> {
    let mut file = fs::File::create(manifest)?;
    for segment in segments {
        writeln!(file, "{}", manifest_line(&segment.path))?;
    }
    file.flush()?;
    Ok(())
}

/// Convert one job: extract every merged interval, concatenate, tag.
///
/// Subtitles are parsed and merged before any process starts. The job's
/// temp directory is removed on every exit path.
pub async fn convert_job(
    ctx: &JobContext<'_>,
    job: &Job,
    job_index: usize,
    num_jobs: usize,
    on_progress: &mut (dyn FnMut(Progress) + Send),
) -> Result<JobSummary> {
    let start_time = Instant::now();

    let output_format = OutputFormat::from_path(&job.output_file)?;
    if !job.media_file.is_file() {
        return Err(CondenseError::FileNotFound(
            job.media_file.display().to_string(),
        ));
    }

    let (entry_count, intervals) = load_intervals(&job.subtitle_file, ctx.options.join_secs)?;
    if intervals.is_empty() {
        return Err(CondenseError::NoDialogue(
            job.subtitle_file.display().to_string(),
        ));
    }

    info!(
        "[{}/{}] {}: {} subtitles merged into {} segments",
        job_index + 1,
        num_jobs,
        job.media_file.display(),
        entry_count,
        intervals.len()
    );

    ctx.cancel.check()?;
    let temp_dir = TempCleanupGuard::new(ctx.cancel)?;

    let num_segments = intervals.len();
    let mut segments = Vec::with_capacity(num_segments);

    for (index, interval) in intervals.iter().enumerate() {
        ctx.cancel.check()?;

        on_progress(Progress {
            job_index,
            num_jobs,
            segment_index: index,
            num_segments,
        });

        info!(
            "[{}/{}] ({}/{}) {} {}",
            job_index + 1,
            num_jobs,
            index + 1,
            num_segments,
            format_timecode(interval.start),
            format_timecode(interval.end)
        );

        let segment = extract_segment(ctx, job, index, interval, temp_dir.path()).await?;
        segments.push(segment);
    }

    let manifest = temp_dir.path().join(MANIFEST_NAME);
    write_manifest(&segments, &manifest)?;

    if let Some(parent) = job.output_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    ctx.cancel.check()?;
    debug!(
        "Concatenating {} segments into {}",
        segments.len(),
        job.output_file.display()
    );

    // Partial output stays inside the temp directory until it is complete.
    let staged = temp_dir.path().join(staged_name(&job.output_file));
    let concatenated = tokio::select! {
        result = ctx.tool.concat(&manifest, &staged) => result,
        _ = ctx.cancel.cancelled() => Err(CondenseError::Cancelled),
    };
    concatenated?;
    publish_output(&staged, &job.output_file)?;

    drop(temp_dir);

    let tagged = if output_format.is_taggable() {
        ctx.tags.apply(&job.output_file, (job_index + 1) as u32)
    } else {
        false
    };

    Ok(JobSummary {
        output_path: job.output_file.clone(),
        subtitle_entries: entry_count,
        segments: segments.len(),
        audio_secs: segments.iter().map(|s| s.window.duration).sum(),
        tagged,
        elapsed: start_time.elapsed(),
    })
}

fn staged_name(output: &Path) -> PathBuf {
    match output.extension() {
        Some(ext) => Path::new("condensed").with_extension(ext),
        None => PathBuf::from("condensed"),
    }
}

/// Move a finished file to its destination, copying across filesystems.
fn publish_output(staged: &Path, output: &Path) -> Result<()> {
    if fs::rename(staged, output).is_ok() {
        return Ok(());
    }
    if let Err(e) = fs::copy(staged, output) {
        if output.exists() {
            if let Err(remove_err) = fs::remove_file(output) {
                warn!("Failed to remove partial output {:?}: {remove_err}", output);
            }
        }
        return Err(CondenseError::Concatenation(format!(
            "Failed to write {}: {e}",
            output.display()
        )));
    }
    Ok(())
}

async fn extract_segment(
    ctx: &JobContext<'_>,
    job: &Job,
    index: usize,
    interval: &Interval,
    temp_path: &Path,
) -> Result<Segment> {
    let window = ctx.options.window(interval);
    if window.duration <= 0.0 {
        return Err(CondenseError::Extraction(format!(
            "Segment {} has non-positive duration {:.3}s after padding",
            index + 1,
            window.duration
        )));
    }

    let path = temp_path.join(format!("part{index}.mp3"));

    let extracted = tokio::select! {
        result = ctx.tool.extract_clip(window.start, &job.media_file, window.duration, &path) => result,
        _ = ctx.cancel.cancelled() => Err(CondenseError::Cancelled),
    };
    extracted?;

    if !path.is_file() {
        return Err(CondenseError::Extraction(format!(
            "{} produced no output for segment {}",
            ctx.tool.name(),
            index + 1
        )));
    }

    Ok(Segment { window, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        let progress = Progress {
            job_index: 1,
            num_jobs: 2,
            segment_index: 2,
            num_segments: 4,
        };
        assert!((progress.fraction() - 0.75).abs() < 1e-12);

        let first = Progress {
            job_index: 0,
            num_jobs: 3,
            segment_index: 0,
            num_segments: 5,
        };
        assert_eq!(first.fraction(), 0.0);
    }

    #[test]
    fn test_progress_never_reaches_one() {
        let last = Progress {
            job_index: 2,
            num_jobs: 3,
            segment_index: 9,
            num_segments: 10,
        };
        assert!(last.fraction() < 1.0);
    }

    #[test]
    fn test_manifest_line_quotes() {
        assert_eq!(
            manifest_line(Path::new("/tmp/x/part0.mp3")),
            "file '/tmp/x/part0.mp3'"
        );
        assert_eq!(
            manifest_line(Path::new("/tmp/it's/part1.mp3")),
            r"file '/tmp/it'\''s/part1.mp3'"
        );
    }

    #[test]
    fn test_write_manifest_order() {
        let dir = TempDir::new().unwrap();
        let window = crate::audio::ClipWindow {
            start: 0.0,
            duration: 1.0,
        };
        let segments: Vec<Segment> = (0..3)
            .map(|index| Segment {
                window,
                path: dir.path().join(format!("part{index}.mp3")),
            })
            .collect();
        let manifest = dir.path().join(MANIFEST_NAME);

        write_manifest(&segments, &manifest).unwrap();

        let contents = fs::read_to_string(&manifest).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("part0.mp3'"));
        assert!(lines[2].ends_with("part2.mp3'"));
    }

    #[test]
    fn test_job_check_formats() {
        assert!(Job::new("a.mkv", "a.srt", "a.mp3").check_formats().is_ok());
        assert!(matches!(
            Job::new("a.mkv", "a.vtt", "a.mp3").check_formats(),
            Err(CondenseError::UnsupportedFormat(_))
        ));
        assert!(Job::new("a.mkv", "a.ass", "a.ogg").check_formats().is_err());
    }

    #[test]
    fn test_load_intervals_merges() {
        let dir = TempDir::new().unwrap();
        let subs = dir.path().join("a.srt");
        fs::write(
            &subs,
            "1\n00:00:00,000 --> 00:00:01,000\nA\n\n2\n00:00:01,500 --> 00:00:02,000\nB\n\n3\n00:00:05,000 --> 00:00:06,000\nC\n\n",
        )
        .unwrap();

        let (count, intervals) = load_intervals(&subs, 1.0).unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            intervals,
            vec![Interval::new(0.0, 2.0), Interval::new(5.0, 6.0)]
        );
    }

    #[test]
    fn test_staged_name_keeps_extension() {
        assert_eq!(
            staged_name(Path::new("out/Show - 1.mp3")),
            PathBuf::from("condensed.mp3")
        );
        assert_eq!(staged_name(Path::new("noext")), PathBuf::from("condensed"));
    }

    #[test]
    fn test_publish_output_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("condensed.mka");
        let output = dir.path().join("ep1.mka");
        fs::write(&staged, b"new").unwrap();
        fs::write(&output, b"old").unwrap();

        publish_output(&staged, &output).unwrap();

        assert_eq!(fs::read(&output).unwrap(), b"new");
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_cancel_flag_resolves() {
        let flag = CancelFlag::new();
        assert!(flag.check().is_ok());

        let waiter = flag.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        flag.cancel();
        handle.await.unwrap();

        assert!(matches!(flag.check(), Err(CondenseError::Cancelled)));
    }
}
