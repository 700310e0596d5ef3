// ID3 tagging of finished outputs

use crate::error::{CondenseError, Result};
use id3::frame::{Picture, PictureType};
use id3::{ErrorKind, Tag, TagLike, Version};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Album information applied to every output of a batch.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Album name; empty means leave the album untouched.
    pub album: String,
    /// Cover image, used when it is a PNG or JPEG file.
    pub album_art: Option<PathBuf>,
}

/// Containers the concatenation step may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3,
    Mka,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" => Ok(OutputFormat::Mp3),
            "mka" => Ok(OutputFormat::Mka),
            _ => Err(CondenseError::UnsupportedFormat(format!(
                "{} (expected .mp3 or .mka)",
                path.display()
            ))),
        }
    }

    /// Whether ID3 tags can be written to this container.
    pub fn is_taggable(&self) -> bool {
        matches!(self, OutputFormat::Mp3)
    }
}

/// Image bytes ready to embed.
#[derive(Debug, Clone)]
pub struct AlbumArt {
    pub data: Vec<u8>,
    pub mime: &'static str,
}

impl AlbumArt {
    /// MIME type for a supported image extension.
    pub fn mime_for(path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            _ => None,
        }
    }

    /// Read the image, or `None` when the extension is not supported.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Some(mime) = Self::mime_for(path) else {
            return Ok(None);
        };
        let data = std::fs::read(path)?;
        Ok(Some(Self { data, mime }))
    }
}

/// Title derived from an output path: its file name without extension.
pub fn track_title(output: &Path) -> String {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Writes batch-wide and per-track tags onto finished outputs.
#[derive(Debug, Clone, Default)]
pub struct TagWriter {
    album: String,
    art: Option<AlbumArt>,
}

impl TagWriter {
    /// Prepare tags for a batch, reading the album art once.
    pub fn new(metadata: &Metadata) -> Self {
        let art = metadata.album_art.as_deref().and_then(|path| {
            match AlbumArt::load(path) {
                Ok(Some(art)) => Some(art),
                Ok(None) => {
                    warn!(
                        "Album art {} is not a PNG or JPEG, skipping",
                        path.display()
                    );
                    None
                }
                Err(e) => {
                    warn!("Failed to read album art {}: {e}", path.display());
                    None
                }
            }
        });

        Self {
            album: metadata.album.trim_end().to_string(),
            art,
        }
    }

    /// Tag `output` as track number `track`. Returns whether tags were saved.
    ///
    /// Failures are logged, never raised, so tagging cannot fail a job.
    pub fn apply(&self, output: &Path, track: u32) -> bool {
        if !output.is_file() {
            warn!("Skipping tags, {} does not exist", output.display());
            return false;
        }

        match self.write(output, track) {
            Ok(()) => {
                debug!("Tagged {} as track {}", output.display(), track);
                true
            }
            Err(e) => {
                warn!("Failed to tag {}: {e}", output.display());
                false
            }
        }
    }

    fn write(&self, output: &Path, track: u32) -> std::result::Result<(), id3::Error> {
        let mut tag = match Tag::read_from_path(output) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => Tag::new(),
            Err(e) => return Err(e),
        };

        if !self.album.is_empty() {
            tag.set_album(self.album.clone());
        }

        if let Some(art) = &self.art {
            tag.remove_picture_by_type(PictureType::CoverFront);
            tag.add_frame(Picture {
                mime_type: art.mime.to_string(),
                picture_type: PictureType::CoverFront,
                description: String::new(),
                data: art.data.clone(),
            });
        }

        tag.set_title(track_title(output));
        tag.set_track(track);

        tag.write_to_path(output, Version::Id3v24)
    }
}
