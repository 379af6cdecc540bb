//! Short-time Fourier transform
//!
//! Centered STFT with a periodic Hann window, and the matching
//! overlap-add inverse normalized by the summed squared window.

use std::f32::consts::TAU;
use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// Analysis window size in samples
pub const N_FFT: usize = 2048;

/// Hop between successive frames
pub const HOP_LENGTH: usize = N_FFT / 4;

/// One analysis frame: the non-negative frequency bins (`n_fft / 2 + 1`)
pub type Frame = Vec<Complex32>;

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (TAU * i as f32 / size as f32).cos()))
        .collect()
}

/// Forward/inverse STFT sharing one FFT plan
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Number of frequency bins per frame
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Split a signal into windowed spectral frames.
    ///
    /// The signal is zero-padded by `n_fft / 2` on both sides so frame `t`
    /// is centered on sample `t * hop`.
    pub fn analyze(&self, samples: &[f32]) -> Vec<Frame> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0_f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let num_frames = 1 + (padded.len() - self.n_fft) / self.hop;
        let mut scratch = vec![Complex32::new(0.0, 0.0); self.n_fft];

        (0..num_frames)
            .map(|t| {
                let start = t * self.hop;
                for (i, slot) in scratch.iter_mut().enumerate() {
                    *slot = Complex32::new(padded[start + i] * self.window[i], 0.0);
                }
                self.forward.process(&mut scratch);
                scratch[..self.num_bins()].to_vec()
            })
            .collect()
    }

    /// Overlap-add spectral frames back into a signal of exactly `length` samples
    pub fn synthesize(&self, frames: &[Frame], length: usize) -> Vec<f32> {
        let pad = self.n_fft / 2;
        let total = self.n_fft + self.hop * frames.len().saturating_sub(1);
        let mut output = vec![0.0_f32; total];
        let mut window_sum = vec![0.0_f32; total];
        let mut scratch = vec![Complex32::new(0.0, 0.0); self.n_fft];
        let scale = 1.0 / self.n_fft as f32;

        for (t, frame) in frames.iter().enumerate() {
            fill_full_spectrum(frame, &mut scratch);
            self.inverse.process(&mut scratch);

            let start = t * self.hop;
            for (i, value) in scratch.iter().enumerate() {
                output[start + i] += value.re * scale * self.window[i];
                window_sum[start + i] += self.window[i] * self.window[i];
            }
        }

        for (sample, &norm) in output.iter_mut().zip(window_sum.iter()) {
            if norm > f32::MIN_POSITIVE {
                *sample /= norm;
            }
        }

        let mut signal: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        signal.resize(length, 0.0);
        signal
    }
}

/// Rebuild the full conjugate-symmetric spectrum from the positive bins
fn fill_full_spectrum(bins: &[Complex32], spectrum: &mut [Complex32]) {
    let n = spectrum.len();
    for (k, slot) in spectrum.iter_mut().enumerate() {
        *slot = if k < bins.len() {
            bins[k]
        } else {
            bins[n - k].conj()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate_test_tone;

    #[test]
    fn test_hann_window_shape() {
        let window = hann_window(8);
        assert_eq!(window[0], 0.0);
        assert!((window[4] - 1.0).abs() < 1e-6);
        assert!((window[2] - window[6]).abs() < 1e-6);
    }

    #[test]
    fn test_frame_count() {
        let stft = Stft::new(N_FFT, HOP_LENGTH);
        let frames = stft.analyze(&vec![0.0; 4096]);
        assert_eq!(frames.len(), 1 + 4096 / HOP_LENGTH);
        assert_eq!(frames[0].len(), stft.num_bins());
    }

    #[test]
    fn test_analysis_synthesis_reconstructs_signal() {
        let stft = Stft::new(N_FFT, HOP_LENGTH);
        let tone = generate_test_tone(330.0, 0.5, 0.5, 22050);

        let frames = stft.analyze(&tone.samples);
        let rebuilt = stft.synthesize(&frames, tone.len());

        assert_eq!(rebuilt.len(), tone.len());
        let max_error = tone
            .samples
            .iter()
            .zip(rebuilt.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f32, f32::max);
        assert!(max_error < 1e-3, "max reconstruction error {}", max_error);
    }
}
