//! Audio file I/O for Voicebox
//!
//! Decodes arbitrary input files into mono sample buffers and writes 16-bit
//! PCM WAV. Input decoding goes through symphonia so any supported container
//! or codec (WAV, FLAC, MP3, OGG/Vorbis, ...) can serve as a voice source.
//! The native sample rate is always preserved; nothing is resampled on load.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, warn};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer as InterleavedSamples};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::buffer::SampleBuffer;
use crate::error::{Result, VoiceboxError};

/// Full-scale multiplier for float to 16-bit conversion
const PCM16_SCALE: f32 = 32767.0;

/// WAV layout written for previews and WAV renders
fn pcm16_mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Load an audio file as a mono sample buffer
///
/// Multi-channel sources are downmixed by averaging channels.
///
/// # Errors
/// * `DecodeError` - If the file is missing, unreadable, not a supported
///   container/codec, or contains no audio. The reason includes the
///   decoder's diagnostic text.
pub fn load_audio(path: &Path) -> Result<SampleBuffer> {
    let decode_error = |reason: String| VoiceboxError::DecodeError {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| decode_error(format!("cannot open file: {}", e)))?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_error(format!("unsupported container: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error("no decodable audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_error("stream does not declare a sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(decode_error(format!("failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!("Skipping undecodable packet in {}: {}", path.display(), reason);
                continue;
            }
            Err(e) => return Err(decode_error(format!("decoder failure: {}", e))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let frames = decoded.capacity() as u64;

        // 16-bit PCM decodes on the same 32767 scale `to_pcm16` encodes with
        if matches!(decoded, AudioBufferRef::S16(_)) {
            let mut pcm = InterleavedSamples::<i16>::new(frames, spec);
            pcm.copy_interleaved_ref(decoded);
            let scaled: Vec<f32> = pcm.samples().iter().map(|&s| s as f32 / PCM16_SCALE).collect();
            samples.extend(downmix(&scaled, channels));
        } else {
            let mut interleaved = InterleavedSamples::<f32>::new(frames, spec);
            interleaved.copy_interleaved_ref(decoded);
            samples.extend(downmix(interleaved.samples(), channels));
        }
    }

    if samples.is_empty() {
        return Err(decode_error("file contains no audio samples".to_string()));
    }

    debug!(
        "Loaded {} ({} samples at {} Hz)",
        path.display(),
        samples.len(),
        sample_rate
    );

    Ok(SampleBuffer::new(samples, sample_rate))
}

/// Convert float samples to signed 16-bit PCM
///
/// Uses `round(sample * 32767)` clamped to the 16-bit range, so samples at or
/// beyond full scale saturate instead of wrapping.
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * PCM16_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Convert float samples to raw little-endian 16-bit PCM bytes
pub fn to_pcm16_le_bytes(samples: &[f32]) -> Vec<u8> {
    to_pcm16(samples)
        .into_iter()
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

/// Write a buffer as 16-bit mono WAV to any seekable writer
pub fn write_wav<W: Write + Seek>(
    buffer: &SampleBuffer,
    writer: W,
) -> std::result::Result<(), hound::Error> {
    let mut wav = WavWriter::new(writer, pcm16_mono_spec(buffer.sample_rate))?;
    for sample in to_pcm16(&buffer.samples) {
        wav.write_sample(sample)?;
    }
    wav.finalize()
}

/// Encode a buffer as an in-memory 16-bit mono WAV file
pub fn encode_wav(buffer: &SampleBuffer) -> std::result::Result<Vec<u8>, hound::Error> {
    let mut bytes = Vec::new();
    write_wav(buffer, Cursor::new(&mut bytes))?;
    Ok(bytes)
}

/// Write a buffer as WAV into an already opened file
pub fn write_wav_file(buffer: &SampleBuffer, file: File, path: &Path) -> Result<()> {
    write_wav(buffer, std::io::BufWriter::new(file)).map_err(|e| {
        VoiceboxError::FileWriteError {
            path: path.to_path_buf(),
            source: hound_to_io(e),
        }
    })
}

fn hound_to_io(err: hound::Error) -> std::io::Error {
    match err {
        hound::Error::IoError(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
    }
}

/// Resample to an exact number of samples using linear interpolation
///
/// Linear interpolation aliases slightly on downsampling; it is only used
/// to undo the length change of a pitch-shift stretch, where the ratio stays
/// within one octave.
pub fn resample_to_len(samples: &[f32], target_len: usize) -> Vec<f32> {
    if samples.is_empty() || target_len == 0 {
        return vec![0.0; target_len];
    }

    let source_len = samples.len();
    let step = source_len as f64 / target_len as f64;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        // Map output index to source position
        let src_pos = i as f64 * step;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else {
            samples[source_len - 1]
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Average interleaved frames down to one channel
fn downmix(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved
        .chunks_exact(channels)
        .map(move |frame| frame.iter().sum::<f32>() / channels as f32)
}

// ============================================================================
// Tests
// ============================================================================
