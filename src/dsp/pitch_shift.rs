//! Pitch Shifter
//!
//! Shifts pitch by a number of semitones while keeping the duration. The
//! buffer is time-stretched by the inverse pitch ratio and then resampled
//! back to its original length, which scales every frequency by the ratio.

use log::debug;

use crate::dsp::time_stretch::stretch_samples;
use crate::engine::{resample_to_len, SampleBuffer};
use crate::error::{Result, VoiceboxError};

/// Frequency ratio for a shift in semitones (12 semitones = one octave)
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f64 {
    2.0_f64.powf(semitones as f64 / 12.0)
}

/// Shift the pitch of a buffer by `semitones` without changing its duration
///
/// A shift of exactly 0 returns the input untouched. The range is enforced
/// by the caller; this function accepts any finite value.
///
/// # Errors
/// * `ProcessingError` - If `semitones` is not finite or the buffer is too
///   short for the analysis window
pub fn pitch_shift(buffer: SampleBuffer, semitones: f32) -> Result<SampleBuffer> {
    if semitones == 0.0 {
        return Ok(buffer);
    }

    let operation = format!("pitch shift by {:+.1} semitones", semitones);
    if !semitones.is_finite() {
        return Err(VoiceboxError::processing(
            operation,
            format!("semitones must be finite, got {}", semitones),
        ));
    }

    let ratio = semitones_to_ratio(semitones);
    let stretched = stretch_samples(&buffer.samples, 1.0 / ratio)
        .map_err(|reason| VoiceboxError::processing(operation, reason))?;
    let samples = resample_to_len(&stretched, buffer.len());

    debug!(
        "Pitch shift {:+.1} semitones (ratio {:.4}) over {} samples",
        semitones,
        ratio,
        samples.len()
    );

    Ok(SampleBuffer::new(samples, buffer.sample_rate))
}
