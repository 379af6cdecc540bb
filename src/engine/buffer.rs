//! Sample Buffer
//!
//! The mono floating-point buffer that flows through every processing stage.
//! Each stage consumes a buffer and hands back a new one, since pitch and
//! speed transforms may change its length. The sample rate never changes.

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Sample Buffer
// ============================================================================

/// Owned mono audio at a fixed sample rate
///
/// Samples are nominally in [-1.0, 1.0]; lossy transforms may overshoot
/// slightly, which the encoder clips when quantizing.
///
/// # Example
/// ```
/// use voicebox::engine::SampleBuffer;
///
/// let buffer = SampleBuffer::new(vec![0.0; 44100], 44100);
/// assert_eq!(buffer.len(), 44100);
/// assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Mono sample data
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap existing samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create a buffer of silence
    pub fn silence(num_samples: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; num_samples], sample_rate)
    }

    /// Number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Keep only the first `duration_secs` seconds.
    ///
    /// A source shorter than the requested duration is returned whole; it is
    /// never padded.
    pub fn truncated_to_secs(mut self, duration_secs: f64) -> Self {
        let max_samples = (duration_secs * self.sample_rate as f64).floor() as usize;
        self.samples.truncate(max_samples);
        self
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
    }

    /// RMS level in dB. Returns -f32::INFINITY for empty or silent buffers.
    pub fn rms_db(&self) -> f32 {
        if self.samples.is_empty() {
            return f32::NEG_INFINITY;
        }
        let sum_squares: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        linear_to_db((sum_squares / self.samples.len() as f64).sqrt() as f32)
    }
}

/// Generate a test tone (sine wave)
///
/// Creates a mono buffer containing a sine wave at the specified frequency
/// and amplitude. Useful for testing the processing pipelines.
pub fn generate_test_tone(
    frequency: f32,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> SampleBuffer {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    let angular_freq = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;

    let samples = (0..num_samples)
        .map(|i| amplitude * (angular_freq * i as f64).sin() as f32)
        .collect();

    SampleBuffer::new(samples, sample_rate)
}
