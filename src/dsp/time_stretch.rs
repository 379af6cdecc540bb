//! Time Stretcher
//!
//! Phase-vocoder time stretching: duration changes, pitch does not.
//! The vocoder rate is the speed factor itself, so a factor of 2.0 plays
//! back twice as fast and yields half as many samples.

use std::f64::consts::TAU;

use log::debug;
use rustfft::num_complex::Complex32;

use crate::dsp::stft::{Frame, Stft, HOP_LENGTH, N_FFT};
use crate::engine::SampleBuffer;
use crate::error::{Result, VoiceboxError};

/// Minimum buffer length the analysis can work with
pub const MIN_STRETCH_SAMPLES: usize = HOP_LENGTH;

/// Change the duration of a buffer by `speed_factor` without changing pitch
///
/// `speed_factor > 1.0` shortens the audio, `< 1.0` lengthens it. A factor
/// of exactly 1.0 returns the input untouched.
///
/// # Errors
/// * `ProcessingError` - If the factor is not a positive finite number or the
///   buffer is shorter than one analysis hop
pub fn time_stretch(buffer: SampleBuffer, speed_factor: f32) -> Result<SampleBuffer> {
    if speed_factor == 1.0 {
        return Ok(buffer);
    }

    let operation = format!("time stretch x{:.2}", speed_factor);
    let samples = stretch_samples(&buffer.samples, speed_factor as f64)
        .map_err(|reason| VoiceboxError::processing(operation, reason))?;

    debug!(
        "Time stretch x{:.2}: {} -> {} samples",
        speed_factor,
        buffer.len(),
        samples.len()
    );

    Ok(SampleBuffer::new(samples, buffer.sample_rate))
}

/// Stretch raw samples by a vocoder rate.
///
/// Output length is exactly `round(len / rate)`.
pub(crate) fn stretch_samples(samples: &[f32], rate: f64) -> std::result::Result<Vec<f32>, String> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(format!("rate must be a positive finite number, got {}", rate));
    }
    if samples.len() < MIN_STRETCH_SAMPLES {
        return Err(format!(
            "buffer of {} samples is shorter than the {}-sample analysis hop",
            samples.len(),
            MIN_STRETCH_SAMPLES
        ));
    }

    let stft = Stft::new(N_FFT, HOP_LENGTH);
    let frames = stft.analyze(samples);
    let stretched = phase_vocoder(&frames, rate, stft.hop(), stft.n_fft());

    let target_len = (samples.len() as f64 / rate).round() as usize;
    Ok(stft.synthesize(&stretched, target_len))
}

/// Resample spectral frames along the time axis, keeping phases coherent
///
/// Magnitudes are interpolated between neighbouring frames; phases are
/// advanced by each bin's measured instantaneous frequency.
pub fn phase_vocoder(frames: &[Frame], rate: f64, hop: usize, n_fft: usize) -> Vec<Frame> {
    if frames.is_empty() {
        return Vec::new();
    }

    let num_bins = frames[0].len();
    let num_steps = (frames.len() as f64 / rate).ceil() as usize;

    // Expected phase advance per hop for each bin centre
    let phase_advance: Vec<f64> = (0..num_bins)
        .map(|k| TAU * hop as f64 * k as f64 / n_fft as f64)
        .collect();

    let mut phase_acc: Vec<f64> = frames[0].iter().map(|c| c.arg() as f64).collect();
    let silent = vec![Complex32::new(0.0, 0.0); num_bins];
    let mut output = Vec::with_capacity(num_steps);

    for t in 0..num_steps {
        let step = t as f64 * rate;
        let index = step.floor() as usize;
        if index >= frames.len() {
            break;
        }
        let alpha = (step - index as f64) as f32;

        let current = &frames[index];
        let next = frames.get(index + 1).unwrap_or(&silent);

        let frame: Frame = (0..num_bins)
            .map(|k| {
                let magnitude = (1.0 - alpha) * current[k].norm() + alpha * next[k].norm();
                Complex32::from_polar(magnitude, phase_acc[k] as f32)
            })
            .collect();
        output.push(frame);

        for k in 0..num_bins {
            let delta = next[k].arg() as f64 - current[k].arg() as f64 - phase_advance[k];
            phase_acc[k] += phase_advance[k] + wrap_phase(delta);
        }
    }

    output
}

/// Wrap a phase difference into [-pi, pi]
fn wrap_phase(phase: f64) -> f64 {
    phase - TAU * (phase / TAU).round()
}
