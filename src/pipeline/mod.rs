//! Processing Pipelines
//!
//! `AudioProcessor` owns the settings-derived state shared by the preview and
//! full-render pipelines: the preview directory, the eviction age and the
//! format encoder. Both pipelines run synchronously on the calling thread.

pub mod eviction;
pub mod preview;
pub mod process;
pub mod render;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::dsp::{pitch_shift, time_stretch, PITCH_RANGE, SPEED_RANGE};
use crate::engine::SampleBuffer;
use crate::error::{Result, VoiceboxError};
use crate::render::FormatEncoder;

pub use eviction::{evict_stale_previews, is_preview_file_name, EvictionReport};
pub use process::{process_history_entry, ProcessOutcome};
pub use render::ProcessedOutputMetadata;

/// Pitch and speed requested for a preview or render
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSettings {
    /// Semitones, -12 to 12. Zero leaves the pitch alone.
    pub pitch_semitones: f32,
    /// Playback speed, 0.5 to 2.0. One leaves the tempo alone.
    pub speed_factor: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            pitch_semitones: 0.0,
            speed_factor: 1.0,
        }
    }
}

impl EffectSettings {
    /// Build validated settings
    ///
    /// # Errors
    /// * `InvalidParameter` - If either value is not finite or out of range
    pub fn new(pitch_semitones: f32, speed_factor: f32) -> Result<Self> {
        let settings = Self {
            pitch_semitones,
            speed_factor,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("pitch", self.pitch_semitones, PITCH_RANGE)?;
        check_range("speed", self.speed_factor, SPEED_RANGE)
    }

    /// True when neither transform would change the audio
    pub fn is_identity(&self) -> bool {
        self.pitch_semitones == 0.0 && self.speed_factor == 1.0
    }

    /// Pitch shift then time stretch, skipping whichever is a no-op
    pub fn apply(&self, buffer: SampleBuffer) -> Result<SampleBuffer> {
        let mut buffer = buffer;
        if self.pitch_semitones != 0.0 {
            buffer = pitch_shift(buffer, self.pitch_semitones)?;
        }
        if self.speed_factor != 1.0 {
            buffer = time_stretch(buffer, self.speed_factor)?;
        }
        Ok(buffer)
    }
}

fn check_range(name: &'static str, value: f32, (min, max): (f32, f32)) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(VoiceboxError::InvalidParameter {
            name,
            reason: format!("must be between {} and {}, got {}", min, max, value),
        })
    }
}

/// Entry point for previews, renders and preview eviction
#[derive(Debug, Clone)]
pub struct AudioProcessor {
    preview_dir: PathBuf,
    preview_max_age: Duration,
    encoder: FormatEncoder,
}

impl AudioProcessor {
    /// Build a processor from settings, creating the preview directory.
    ///
    /// A relative preview directory is resolved against the current
    /// directory so returned preview paths are always absolute.
    pub fn new(settings: &Settings) -> Result<Self> {
        let preview_dir = if settings.preview_directory.is_absolute() {
            settings.preview_directory.clone()
        } else {
            env::current_dir()?.join(&settings.preview_directory)
        };

        fs::create_dir_all(&preview_dir).map_err(|e| VoiceboxError::DirectoryCreateError {
            path: preview_dir.clone(),
            source: e,
        })?;

        debug!("Preview directory: {}", preview_dir.display());

        Ok(Self {
            preview_dir,
            preview_max_age: Duration::from_secs(settings.preview_max_age_secs),
            encoder: FormatEncoder::new(&settings.ffmpeg_path),
        })
    }

    pub fn preview_dir(&self) -> &Path {
        &self.preview_dir
    }

    pub fn preview_max_age(&self) -> Duration {
        self.preview_max_age
    }

    pub fn encoder(&self) -> &FormatEncoder {
        &self.encoder
    }

    /// Sweep the preview directory for artifacts older than `max_age`
    pub fn evict(&self, max_age: Duration) -> EvictionReport {
        evict_stale_previews(&self.preview_dir, max_age)
    }
}
