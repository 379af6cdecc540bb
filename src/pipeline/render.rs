//! Full-render pipeline

use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::engine::load_audio;
use crate::error::{Result, VoiceboxError};
use crate::pipeline::{AudioProcessor, EffectSettings};
use crate::render::{AudioFormat, EncodeProfile, EncodeRequest};

/// What a finished render produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedOutputMetadata {
    /// Length of the processed audio in seconds
    pub duration_secs: f64,
    /// Size of the written file in bytes
    pub file_size: u64,
    pub format: AudioFormat,
}

impl AudioProcessor {
    /// Process the whole of `audio_path` and write it to `output_path`.
    ///
    /// The output's parent directory is created if needed. The encoded bytes
    /// are staged in a temporary file next to the destination and renamed
    /// into place, so a failed render never leaves a partial file behind.
    ///
    /// # Errors
    /// * `InvalidParameter` - Bad effect settings
    /// * `DecodeError` - The source could not be decoded
    /// * `ProcessingError` - A transform failed, with the source path attached
    /// * `EncodeError` - The encoder failed
    /// * `DirectoryCreateError` / `FileWriteError` - The output could not be written
    pub fn render(
        &self,
        audio_path: &Path,
        effects: &EffectSettings,
        profile: EncodeProfile,
        output_path: &Path,
    ) -> Result<ProcessedOutputMetadata> {
        effects.validate()?;

        let source = load_audio(audio_path)?;
        let processed = effects
            .apply(source)
            .map_err(|e| e.with_source_path(audio_path))?;
        let duration_secs = processed.duration_secs();
        let format = profile.format();
        debug!(
            "Processed {} samples, peak {:.3}, RMS {:.1} dB",
            processed.len(),
            processed.peak(),
            processed.rms_db()
        );

        let bytes = self.encoder().encode(EncodeRequest::new(processed, profile))?;
        write_atomically(output_path, &bytes)?;

        info!(
            "Rendered {} to {} ({}, {:.2}s, {} bytes)",
            audio_path.display(),
            output_path.display(),
            format,
            duration_secs,
            bytes.len()
        );

        Ok(ProcessedOutputMetadata {
            duration_secs,
            file_size: bytes.len() as u64,
            format,
        })
    }
}

/// Write `bytes` to a temp file beside `path`, then rename it over `path`
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent).map_err(|e| VoiceboxError::DirectoryCreateError {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let write_error = |source: std::io::Error| VoiceboxError::FileWriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut staged = NamedTempFile::new_in(parent).map_err(write_error)?;
    staged.write_all(bytes).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged.persist(path).map_err(|e| write_error(e.error))?;

    Ok(())
}
