//! Output filename derivation for processed renders

use std::path::Path;

use crate::render::format::AudioFormat;

/// Build a descriptive filename for a processed render
///
/// The original extension is dropped; `_p<pitch>` is appended when the pitch
/// changed and `_s<speed>` when the speed changed, both to one decimal place.
/// Negative pitches keep their sign, positive ones carry none.
///
/// # Example
/// ```
/// use voicebox::render::{derive_output_filename, AudioFormat};
///
/// assert_eq!(
///     derive_output_filename("voice.wav", -2.0, 1.5, AudioFormat::Flac),
///     "voice_p-2.0_s1.5.flac"
/// );
/// ```
pub fn derive_output_filename(
    original_name: &str,
    pitch: f32,
    speed: f32,
    format: AudioFormat,
) -> String {
    let base_name = Path::new(original_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| original_name.to_string());

    let mut parts = vec![base_name];
    if pitch != 0.0 {
        parts.push(format!("p{:.1}", pitch));
    }
    if speed != 1.0 {
        parts.push(format!("s{:.1}", speed));
    }

    format!("{}.{}", parts.join("_"), format.extension())
}
