//! Preview pipeline
//!
//! Renders a short WAV of the first seconds of a file with effects applied,
//! so a user can audition settings before a full render.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use log::{info, warn};

use crate::engine::io::write_wav_file;
use crate::engine::load_audio;
use crate::error::{Result, VoiceboxError};
use crate::pipeline::eviction::{PREVIEW_EXTENSION, PREVIEW_PREFIX};
use crate::pipeline::{AudioProcessor, EffectSettings};

/// Last preview id handed out by this process
static LAST_PREVIEW_ID: AtomicU64 = AtomicU64::new(0);

/// Attempts at finding a free preview filename before giving up
const MAX_CREATE_ATTEMPTS: usize = 16;

/// Next preview id: epoch milliseconds, strictly increasing per process
fn next_preview_id() -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let previous = LAST_PREVIEW_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    now.max(previous + 1)
}

fn preview_file_name(id: u64) -> String {
    format!("{}{}{}", PREVIEW_PREFIX, id, PREVIEW_EXTENSION)
}

/// Create a fresh preview file, never reusing an existing name
fn create_preview_file(dir: &Path) -> Result<(File, PathBuf)> {
    let mut last_error = None;

    for _ in 0..MAX_CREATE_ATTEMPTS {
        let path = dir.join(preview_file_name(next_preview_id()));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                last_error = Some((path, e));
            }
            Err(e) => return Err(VoiceboxError::FileWriteError { path, source: e }),
        }
    }

    Err(match last_error {
        Some((path, source)) => VoiceboxError::FileWriteError { path, source },
        None => VoiceboxError::processing("preview", "no preview filename available"),
    })
}

impl AudioProcessor {
    /// Render a preview of the first `duration_secs` of `audio_path`.
    ///
    /// The source is truncated (never padded) before the effects run, so a
    /// speed change makes the preview shorter or longer than `duration_secs`.
    /// Each call writes a new `preview_<id>.wav` and then sweeps previews
    /// older than the configured max age. Returns the absolute path.
    ///
    /// # Errors
    /// * `InvalidParameter` - Bad duration or effect settings
    /// * `DecodeError` - The source could not be decoded
    /// * `ProcessingError` - A transform failed, with the source path attached
    /// * `FileWriteError` - The preview could not be written
    pub fn preview(
        &self,
        audio_path: &Path,
        effects: &EffectSettings,
        duration_secs: f64,
    ) -> Result<PathBuf> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(VoiceboxError::InvalidParameter {
                name: "duration",
                reason: format!("must be a positive number of seconds, got {}", duration_secs),
            });
        }
        effects.validate()?;

        let source = load_audio(audio_path)?.truncated_to_secs(duration_secs);
        let processed = effects
            .apply(source)
            .map_err(|e| e.with_source_path(audio_path))?;

        let (file, path) = create_preview_file(self.preview_dir())?;
        if let Err(e) = write_wav_file(&processed, file, &path) {
            if let Err(remove_err) = std::fs::remove_file(&path) {
                warn!("Failed to remove partial preview {}: {}", path.display(), remove_err);
            }
            return Err(e);
        }

        info!(
            "Preview of {} written to {} ({:.2}s, pitch {:+.1}, speed {:.2})",
            audio_path.display(),
            path.display(),
            processed.duration_secs(),
            effects.pitch_semitones,
            effects.speed_factor
        );

        self.evict(self.preview_max_age());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::engine::{encode_wav, generate_test_tone};
    use crate::pipeline::is_preview_file_name;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn processor_in(temp: &TempDir) -> AudioProcessor {
        let settings = Settings {
            preview_directory: temp.path().join("previews"),
            ..Default::default()
        };
        AudioProcessor::new(&settings).unwrap()
    }

    fn write_tone(temp: &TempDir, secs: f32, sample_rate: u32) -> PathBuf {
        let path = temp.path().join("source.wav");
        let tone = generate_test_tone(220.0, 0.5, secs, sample_rate);
        fs::write(&path, encode_wav(&tone).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_preview_ids_strictly_increase() {
        let ids: Vec<u64> = (0..100).map(|_| next_preview_id()).collect();
        assert!(ids.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn test_preview_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..50).map(|_| next_preview_id()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate preview id {}", id);
            }
        }
    }

    #[test]
    fn test_preview_truncates_source() {
        let temp = tempdir().unwrap();
        let source = write_tone(&temp, 3.0, 8000);
        let processor = processor_in(&temp);

        let path = processor
            .preview(&source, &EffectSettings::default(), 1.0)
            .unwrap();

        assert!(path.is_absolute());
        assert!(is_preview_file_name(
            &path.file_name().unwrap().to_string_lossy()
        ));
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 8000);
    }

    #[test]
    fn test_each_preview_is_a_new_file() {
        let temp = tempdir().unwrap();
        let source = write_tone(&temp, 0.5, 8000);
        let processor = processor_in(&temp);

        let first = processor.preview(&source, &EffectSettings::default(), 1.0).unwrap();
        let second = processor.preview(&source, &EffectSettings::default(), 1.0).unwrap();

        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }

    #[test]
    fn test_preview_rejects_bad_duration() {
        let temp = tempdir().unwrap();
        let source = write_tone(&temp, 0.5, 8000);
        let processor = processor_in(&temp);

        for duration in [0.0, -1.0, f64::NAN] {
            let err = processor
                .preview(&source, &EffectSettings::default(), duration)
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_PARAMETER");
        }
    }

    #[test]
    fn test_preview_of_missing_file_is_decode_error() {
        let temp = tempdir().unwrap();
        let processor = processor_in(&temp);

        let err = processor
            .preview(&temp.path().join("nope.wav"), &EffectSettings::default(), 1.0)
            .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR");
    }
}
