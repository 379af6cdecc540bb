//! Synthesis Engine
//!
//! A handle around a text-to-speech model. Loading a model is expensive, so
//! the engine takes a loader and runs it on first use, exactly once, no
//! matter how many threads ask for speech at the same time.

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use log::info;

use crate::engine::{encode_wav, SampleBuffer};
use crate::error::{Result, VoiceboxError};

/// A loaded text-to-speech model
pub trait Synthesizer: Send + Sync {
    /// Native output sample rate of the model
    fn sample_rate(&self) -> u32;

    /// Speak `text` in the voice of the reference recording
    fn synthesize(&self, text: &str, reference_audio: &Path) -> Result<SampleBuffer>;
}

type Loader = Box<dyn Fn() -> Result<Box<dyn Synthesizer>> + Send + Sync>;

pub struct SynthesisEngine {
    loader: Loader,
    model: OnceLock<Box<dyn Synthesizer>>,
    load_guard: Mutex<()>,
}

impl fmt::Debug for SynthesisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisEngine")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl SynthesisEngine {
    /// Create an engine that builds its model with `loader` on first use
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Synthesizer>> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            model: OnceLock::new(),
            load_guard: Mutex::new(()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// The model, loading it if this is the first call.
    ///
    /// A failed load is not cached; the next call tries again.
    pub fn model(&self) -> Result<&dyn Synthesizer> {
        if let Some(model) = self.model.get() {
            return Ok(&**model);
        }

        let _guard = self.load_guard.lock().map_err(|_| VoiceboxError::SynthesisError {
            reason: "model loader panicked on another thread".to_string(),
        })?;

        if self.model.get().is_none() {
            let model = (self.loader)()?;
            info!("Synthesis model loaded, sample rate {} Hz", model.sample_rate());
            // Cannot already be set while the guard is held
            let _ = self.model.set(model);
        }

        self.model
            .get()
            .map(|model| &**model)
            .ok_or_else(|| VoiceboxError::SynthesisError {
                reason: "model failed to initialize".to_string(),
            })
    }

    /// Speak `text` in the voice of `reference_audio`, returning the samples
    ///
    /// # Errors
    /// * `SynthesisError` - If the reference is missing, or the model fails
    pub fn generate(&self, text: &str, reference_audio: &Path) -> Result<SampleBuffer> {
        if !reference_audio.exists() {
            return Err(VoiceboxError::SynthesisError {
                reason: format!("reference audio not found: {}", reference_audio.display()),
            });
        }

        self.model()?.synthesize(text, reference_audio)
    }

    /// Like [`generate`](Self::generate) but returns a complete WAV file
    pub fn generate_wav(&self, text: &str, reference_audio: &Path) -> Result<Vec<u8>> {
        let buffer = self.generate(text, reference_audio)?;
        encode_wav(&buffer).map_err(|e| VoiceboxError::EncodeError {
            format: "wav".to_string(),
            reason: e.to_string(),
        })
    }
}
