//! Format Encoder
//!
//! Serializes a sample buffer into WAV, MP3, OGG/Vorbis or FLAC.
//!
//! WAV is written in memory with hound. The lossy and FLAC formats go
//! through ffmpeg: the 16-bit PCM is staged in a temporary input file, ffmpeg
//! writes a temporary output file, and the bytes are read back. Both
//! temporaries are deleted when their handles drop, on every exit path.
//! They live in the system temp dir unless [`FormatEncoder::with_temp_dir`]
//! points them elsewhere.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::engine::{encode_wav, to_pcm16_le_bytes, SampleBuffer};
use crate::error::{Result, VoiceboxError};
use crate::render::format::{AudioFormat, EncodeProfile};

/// A buffer paired with the profile it should be encoded with
///
/// Consumed by a single call to [`FormatEncoder::encode`].
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub buffer: SampleBuffer,
    pub profile: EncodeProfile,
}

impl EncodeRequest {
    pub fn new(buffer: SampleBuffer, profile: EncodeProfile) -> Self {
        Self { buffer, profile }
    }
}

/// Encodes sample buffers into the supported output formats
#[derive(Debug, Clone)]
pub struct FormatEncoder {
    ffmpeg_path: PathBuf,
    temp_dir: Option<PathBuf>,
}

impl FormatEncoder {
    /// Create an encoder that runs the given ffmpeg executable
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            temp_dir: None,
        }
    }

    /// Stage ffmpeg input and output files in `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Encode a request into the bytes of a complete audio file
    ///
    /// # Errors
    /// * `EncodeError` - Naming the format and carrying the encoder's
    ///   diagnostic output
    pub fn encode(&self, request: EncodeRequest) -> Result<Vec<u8>> {
        let EncodeRequest { buffer, profile } = request;
        let format = profile.format();

        let bytes = match profile {
            EncodeProfile::Wav => encode_wav(&buffer).map_err(|e| encode_error(format, e))?,
            other => self.encode_with_ffmpeg(&buffer, &other)?,
        };

        debug!(
            "Encoded {} samples at {} Hz as {} ({} bytes)",
            buffer.len(),
            buffer.sample_rate,
            format,
            bytes.len()
        );

        Ok(bytes)
    }

    fn encode_with_ffmpeg(&self, buffer: &SampleBuffer, profile: &EncodeProfile) -> Result<Vec<u8>> {
        let format = profile.format();

        let mut pcm_file = self
            .staging_file("voicebox_pcm_", ".s16le")
            .map_err(|e| encode_error(format, format!("failed to create temp input: {}", e)))?;
        pcm_file
            .write_all(&to_pcm16_le_bytes(&buffer.samples))
            .and_then(|_| pcm_file.flush())
            .map_err(|e| encode_error(format, format!("failed to stage PCM input: {}", e)))?;

        let output_file = self
            .staging_file("voicebox_enc_", &format!(".{}", format.extension()))
            .map_err(|e| encode_error(format, format!("failed to create temp output: {}", e)))?;

        let codec_args = ffmpeg_codec_args(profile);
        info!(
            "Running {} for {} ({})",
            self.ffmpeg_path.display(),
            format,
            codec_args.join(" ")
        );

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg("s16le")
            .arg("-ar")
            .arg(buffer.sample_rate.to_string())
            .arg("-ac")
            .arg("1")
            .arg("-i")
            .arg(pcm_file.path())
            .args(&codec_args)
            .arg(output_file.path())
            .output()
            .map_err(|e| {
                encode_error(
                    format,
                    format!("failed to run {}: {}", self.ffmpeg_path.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(encode_error(
                format,
                format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        fs::read(output_file.path())
            .map_err(|e| encode_error(format, format!("failed to read encoder output: {}", e)))
    }

    fn staging_file(&self, prefix: &str, suffix: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(suffix);
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

impl Default for FormatEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Codec, quality and muxer arguments for a profile
pub fn ffmpeg_codec_args(profile: &EncodeProfile) -> Vec<String> {
    let (codec, quality) = match profile {
        EncodeProfile::Wav => ("pcm_s16le", None),
        EncodeProfile::Mp3 { bitrate } => ("libmp3lame", Some(("-b:a", bitrate.clone()))),
        EncodeProfile::Ogg { quality } => ("libvorbis", Some(("-q:a", quality.to_string()))),
        EncodeProfile::Flac { compression } => (
            "flac",
            Some(("-compression_level", compression.to_string())),
        ),
    };

    let mut args = vec!["-codec:a".to_string(), codec.to_string()];
    if let Some((flag, value)) = quality {
        args.push(flag.to_string());
        args.push(value);
    }
    args.push("-f".to_string());
    args.push(profile.format().extension().to_string());
    args
}

fn encode_error(format: AudioFormat, reason: impl ToString) -> VoiceboxError {
    VoiceboxError::EncodeError {
        format: format.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_test_tone, load_audio};
    use tempfile::tempdir;

    #[test]
    fn test_wav_encode_needs_no_ffmpeg() {
        let encoder = FormatEncoder::new("/nonexistent/ffmpeg");
        let tone = generate_test_tone(440.0, 0.5, 0.25, 16000);

        let bytes = encoder
            .encode(EncodeRequest::new(tone.clone(), EncodeProfile::Wav))
            .unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // Header plus two bytes per sample
        let data_len = tone.len() * 2;
        assert!(bytes.len() >= data_len + 44 && bytes.len() <= data_len + 80);
    }

    #[test]
    fn test_wav_encode_decodes_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let tone = generate_test_tone(440.0, 0.5, 0.25, 16000);

        let bytes = FormatEncoder::default()
            .encode(EncodeRequest::new(tone.clone(), EncodeProfile::Wav))
            .unwrap();
        fs::write(&path, bytes).unwrap();

        let decoded = load_audio(&path).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.len(), tone.len());
    }

    #[test]
    fn test_missing_ffmpeg_is_encode_error_naming_format() {
        let encoder = FormatEncoder::new("/nonexistent/ffmpeg");
        let tone = generate_test_tone(440.0, 0.5, 0.25, 16000);

        let err = encoder
            .encode(EncodeRequest::new(
                tone,
                EncodeProfile::Mp3 {
                    bitrate: "128k".to_string(),
                },
            ))
            .unwrap_err();

        match err {
            VoiceboxError::EncodeError { format, reason } => {
                assert_eq!(format, "mp3");
                assert!(reason.contains("/nonexistent/ffmpeg"), "{}", reason);
            }
            other => panic!("Expected EncodeError, got: {:?}", other),
        }
    }

    fn staged_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn test_missing_ffmpeg_leaves_no_staged_files() {
        let staging = tempdir().unwrap();
        let encoder = FormatEncoder::new("/nonexistent/ffmpeg").with_temp_dir(staging.path());
        let tone = generate_test_tone(440.0, 0.5, 0.25, 16000);

        let result = encoder.encode(EncodeRequest::new(tone, EncodeProfile::Ogg { quality: 5 }));

        assert!(matches!(result, Err(VoiceboxError::EncodeError { .. })));
        assert_eq!(staged_files(staging.path()), Vec::<PathBuf>::new());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_ffmpeg_leaves_no_staged_files() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempdir().unwrap();
        let fake_ffmpeg = bin.path().join("ffmpeg");
        fs::write(&fake_ffmpeg, "#!/bin/sh\necho 'unsupported codec' >&2\nexit 3\n").unwrap();
        fs::set_permissions(&fake_ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();

        let staging = tempdir().unwrap();
        let encoder = FormatEncoder::new(&fake_ffmpeg).with_temp_dir(staging.path());
        let tone = generate_test_tone(440.0, 0.5, 0.25, 16000);

        let err = encoder
            .encode(EncodeRequest::new(tone, EncodeProfile::Flac { compression: 5 }))
            .unwrap_err();

        match err {
            VoiceboxError::EncodeError { format, reason } => {
                assert_eq!(format, "flac");
                assert!(reason.contains("unsupported codec"), "{}", reason);
            }
            other => panic!("Expected EncodeError, got: {:?}", other),
        }
        assert_eq!(staged_files(staging.path()), Vec::<PathBuf>::new());
    }

    #[test]
    fn test_successful_encode_leaves_no_staged_files() {
        let available = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);
        if !available {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }

        let staging = tempdir().unwrap();
        let encoder = FormatEncoder::default().with_temp_dir(staging.path());
        let tone = generate_test_tone(440.0, 0.5, 0.25, 16000);

        let bytes = encoder
            .encode(EncodeRequest::new(tone, EncodeProfile::Flac { compression: 5 }))
            .unwrap();

        assert_eq!(&bytes[0..4], b"fLaC");
        assert_eq!(staged_files(staging.path()), Vec::<PathBuf>::new());
    }

    #[test]
    fn test_codec_args_carry_quality_parameter() {
        assert_eq!(
            ffmpeg_codec_args(&EncodeProfile::Mp3 {
                bitrate: "320k".to_string()
            }),
            vec!["-codec:a", "libmp3lame", "-b:a", "320k", "-f", "mp3"]
        );
        assert_eq!(
            ffmpeg_codec_args(&EncodeProfile::Ogg { quality: 7 }),
            vec!["-codec:a", "libvorbis", "-q:a", "7", "-f", "ogg"]
        );
        assert_eq!(
            ffmpeg_codec_args(&EncodeProfile::Flac { compression: 8 }),
            vec!["-codec:a", "flac", "-compression_level", "8", "-f", "flac"]
        );
    }
}
