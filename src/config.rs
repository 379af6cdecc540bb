//! Settings
//!
//! Runtime configuration read once when an [`AudioProcessor`] is built.
//! Stored as pretty JSON; every field has a default so partial files load.
//!
//! [`AudioProcessor`]: crate::pipeline::AudioProcessor

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoiceboxError};

/// Overrides `preview_directory`
pub const ENV_PREVIEW_DIR: &str = "VOICEBOX_PREVIEW_DIR";

/// Overrides `ffmpeg_path`
pub const ENV_FFMPEG: &str = "VOICEBOX_FFMPEG";

/// Overrides `yt_dlp_path`
pub const ENV_YT_DLP: &str = "VOICEBOX_YT_DLP";

const DEFAULT_PREVIEW_MAX_AGE_SECS: u64 = 300;
const DEFAULT_PREVIEW_DURATION_SECS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where preview artifacts are written and swept
    pub preview_directory: PathBuf,
    /// Previews older than this are deleted by the eviction sweep
    pub preview_max_age_secs: u64,
    /// Default preview length when the caller does not pass one
    pub preview_duration_secs: f64,
    pub ffmpeg_path: PathBuf,
    pub yt_dlp_path: PathBuf,
    /// Root under which each project keeps `history.json` and `outputs/`
    pub projects_directory: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preview_directory: env::temp_dir().join("voicebox_previews"),
            preview_max_age_secs: DEFAULT_PREVIEW_MAX_AGE_SECS,
            preview_duration_secs: DEFAULT_PREVIEW_DURATION_SECS,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            yt_dlp_path: PathBuf::from("yt-dlp"),
            projects_directory: PathBuf::from("data/projects"),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// logged and also yields the defaults, so a bad settings file never
    /// keeps the tool from starting.
    pub fn load(path: &Path) -> Settings {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Settings::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read settings {}: {}", path.display(), e);
                return Settings::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Malformed settings {}: {}, using defaults", path.display(), e);
                Settings::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VoiceboxError::DirectoryCreateError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| VoiceboxError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Apply `VOICEBOX_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Settings {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Settings
    where
        F: Fn(&str) -> Option<String>,
    {
        let value_of = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = value_of(ENV_PREVIEW_DIR) {
            self.preview_directory = PathBuf::from(dir);
        }
        if let Some(ffmpeg) = value_of(ENV_FFMPEG) {
            self.ffmpeg_path = PathBuf::from(ffmpeg);
        }
        if let Some(yt_dlp) = value_of(ENV_YT_DLP) {
            self.yt_dlp_path = PathBuf::from(yt_dlp);
        }
        self
    }
}
