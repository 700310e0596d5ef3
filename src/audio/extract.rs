use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CondenseError, Result};
use crate::subtitle::format_timecode;

/// External media processing used by the pipeline.
///
/// Each call is one blocking unit of work from the pipeline's point of
/// view. Dropping the returned future must stop any process it started.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Cut `duration` seconds of the best audio stream of `source`,
    /// starting at `seek`, and transcode it to a VBR file at `output`.
    async fn extract_clip(
        &self,
        seek: f64,
        source: &Path,
        duration: f64,
        output: &Path,
    ) -> Result<()>;

    /// Stream-copy the files listed in `manifest` into `output`,
    /// overwriting it.
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<()>;

    fn name(&self) -> &str;
}

/// Check that `path` runs and identifies itself as FFmpeg.
pub fn check_ffmpeg(path: &Path) -> bool {
    let output = std::process::Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) => {
            let ok = output.status.success() && output.stdout.starts_with(b"ffmpeg");
            debug!("FFmpeg check {}: {}", path.display(), ok);
            ok
        }
        Err(e) => {
            debug!("FFmpeg check {} failed: {e}", path.display());
            false
        }
    }
}

/// FFmpeg invoked through an already resolved executable path.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    path: PathBuf,
}

impl Ffmpeg {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `path` if it passes the availability check.
    pub fn locate(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !check_ffmpeg(&path) {
            return Err(CondenseError::Config(format!(
                "FFmpeg not found at '{}'. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux), or pass --ffmpeg",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run(&self, args: Vec<OsString>) -> std::io::Result<ExitStatus> {
        debug!("Running {} {:?}", self.path.display(), args);

        Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
    }
}

#[async_trait]
impl MediaTool for Ffmpeg {
    async fn extract_clip(
        &self,
        seek: f64,
        source: &Path,
        duration: f64,
        output: &Path,
    ) -> Result<()> {
        let args: Vec<OsString> = vec![
            "-loglevel".into(),
            "panic".into(),
            "-ss".into(),
            format_timecode(seek).into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-t".into(),
            format_timecode(duration).into(),
            "-q:a".into(),
            "0".into(),
            "-map".into(),
            "a".into(),
            output.as_os_str().to_owned(),
        ];

        let status = self
            .run(args)
            .await
            .map_err(|e| CondenseError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

        if !status.success() {
            return Err(CondenseError::Extraction(format!(
                "FFmpeg exited with {status} while extracting {}",
                output.display()
            )));
        }

        Ok(())
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> Result<()> {
        let args: Vec<OsString> = vec![
            "-loglevel".into(),
            "panic".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            manifest.as_os_str().to_owned(),
            "-c".into(),
            "copy".into(),
            "-y".into(),
            output.as_os_str().to_owned(),
        ];

        let status = self
            .run(args)
            .await
            .map_err(|e| CondenseError::Concatenation(format!("Failed to run FFmpeg: {e}")))?;

        if !status.success() {
            return Err(CondenseError::Concatenation(format!(
                "FFmpeg exited with {status} while writing {}",
                output.display()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
