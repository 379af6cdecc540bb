//! DSP Transforms
//!
//! Frequency-domain pitch and speed transforms built on a shared STFT.
//! Both transforms consume a buffer and return a new one, never alias it,
//! and never change the sample rate.

pub mod pitch_shift;
pub mod stft;
pub mod time_stretch;

pub use pitch_shift::{pitch_shift, semitones_to_ratio};
pub use stft::{Stft, HOP_LENGTH, N_FFT};
pub use time_stretch::{phase_vocoder, time_stretch};

/// Pitch shift range in semitones accepted by the pipelines
pub const PITCH_RANGE: (f32, f32) = (-12.0, 12.0);

/// Speed factor range accepted by the pipelines
pub const SPEED_RANGE: (f32, f32) = (0.5, 2.0);
