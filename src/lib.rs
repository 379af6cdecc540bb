//! Voicebox - Audio Core of a Voice Cloning Studio
//!
//! Voicebox post-processes generated or imported voice clips:
//! 1. Load any supported audio file as a mono float buffer
//! 2. Shift pitch and change speed with a phase vocoder
//! 3. Re-encode to WAV, MP3, OGG/Vorbis or FLAC with per-format quality
//!
//! # Architecture
//!
//! - `engine`: decoding, sample buffers and PCM conversion
//! - `dsp`: STFT, time stretch and pitch shift
//! - `render`: output formats, encoder and output naming
//! - `pipeline`: previews with eviction, full renders, history processing
//! - `state`: project history and task progress
//! - `clip`, `synth`: clip import and the text-to-speech handle

pub mod cli;
pub mod clip;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod state;
pub mod synth;

pub use error::{Result, VoiceboxError};
