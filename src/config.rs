use crate::audio::Options;
use crate::error::{CondenseError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// FFmpeg executable, either a name on PATH or a full path.
    pub ffmpeg_path: String,
    pub join_secs: f64,
    pub pre_pad: f64,
    pub post_pad: f64,
    /// Abort the batch at the first failed job.
    pub fail_fast: bool,
}

impl Default for Config {
    fn default() -> Self {
        let options = Options::default();
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            join_secs: options.join_secs,
            pre_pad: options.pre_pad,
            post_pad: options.post_pad,
            fail_fast: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from(&config_path)?;
            }
        }

        // Override with environment variables
        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Read a config file. A file that does not parse is an error, not a reset.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            CondenseError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("CONDENSE_FFMPEG") {
            self.ffmpeg_path = path;
        }
        if let Some(Ok(secs)) = var("CONDENSE_JOIN_SECS").map(|v| v.parse::<f64>()) {
            self.join_secs = secs;
        }
        if let Some(Ok(secs)) = var("CONDENSE_PRE_PAD").map(|v| v.parse::<f64>()) {
            self.pre_pad = secs;
        }
        if let Some(Ok(secs)) = var("CONDENSE_POST_PAD").map(|v| v.parse::<f64>()) {
            self.post_pad = secs;
        }
    }

    pub fn options(&self) -> Options {
        Options {
            join_secs: self.join_secs,
            pre_pad: self.pre_pad,
            post_pad: self.post_pad,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err(CondenseError::Config(
                "ffmpeg_path must not be empty".to_string(),
            ));
        }

        self.options().validate()
    }

    /// Persist to the user config file, returning where it was written.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_file_path().ok_or_else(|| {
            CondenseError::Config("No config directory on this platform".to_string())
        })?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_content = toml::to_string_pretty(self)
            .map_err(|e| CondenseError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&config_path, toml_content)?;

        Ok(config_path)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("condense").join("config.toml"))
    }
}
