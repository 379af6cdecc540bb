//! Audio Engine Module
//!
//! Core audio plumbing:
//! - Mono sample buffer
//! - File decoding and WAV writing

pub mod buffer;
pub mod io;

pub use buffer::{generate_test_tone, SampleBuffer};
pub use io::{encode_wav, load_audio, resample_to_len, to_pcm16, to_pcm16_le_bytes};
