//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};

use crate::cli::{EffectArgs, QualityArgs};
use crate::clip::{ClipExtractor, ClipRequest, YtDlpExtractor};
use crate::config::Settings;
use crate::error::Result;
use crate::pipeline::{process_history_entry, AudioProcessor};
use crate::render::{derive_output_filename, AudioFormat, EncodeProfile};
use crate::state::{JsonHistoryStore, ProgressTracker};

/// Render a preview and print its path.
pub fn preview(
    settings: &Settings,
    input: &Path,
    effects: EffectArgs,
    duration: Option<f64>,
) -> Result<()> {
    let effects = effects.to_settings()?;
    let duration = duration.unwrap_or(settings.preview_duration_secs);
    info!("Previewing {} ({}s)", input.display(), duration);

    let processor = AudioProcessor::new(settings)?;
    let path = processor.preview(input, &effects, duration)?;

    println!("{}", path.display());
    Ok(())
}

/// Render a whole file and print its metadata.
pub fn render(
    settings: &Settings,
    input: &Path,
    output: &Path,
    effects: EffectArgs,
    format: Option<AudioFormat>,
    quality: QualityArgs,
) -> Result<()> {
    let effects = effects.to_settings()?;
    let format = match format {
        Some(format) => format,
        None => format_from_extension(output)?,
    };
    let profile = EncodeProfile::resolve(format, &quality.into())?;

    let processor = AudioProcessor::new(settings)?;
    let metadata = processor.render(input, &effects, profile, output)?;

    println!("Rendered: {}", output.display());
    println!("Format: {}", metadata.format);
    println!("Duration: {:.2}s", metadata.duration_secs);
    println!("Size: {} bytes", metadata.file_size);
    Ok(())
}

/// Process a history entry and print the new entry.
pub fn process(
    settings: &Settings,
    project: &Path,
    entry_id: &str,
    effects: EffectArgs,
    format: AudioFormat,
    quality: QualityArgs,
) -> Result<()> {
    let effects = effects.to_settings()?;
    let profile = EncodeProfile::resolve(format, &quality.into())?;
    let project_dir = settings.projects_directory.join(project);
    info!("Processing entry {} in {}", entry_id, project_dir.display());

    let processor = AudioProcessor::new(settings)?;
    let mut store = JsonHistoryStore::open(&project_dir)?;
    let outcome = process_history_entry(
        &processor,
        &mut store,
        &project_dir,
        entry_id,
        &effects,
        profile,
    )?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Sweep stale previews.
pub fn evict(settings: &Settings, max_age: Option<u64>) -> Result<()> {
    let max_age = Duration::from_secs(max_age.unwrap_or(settings.preview_max_age_secs));

    let processor = AudioProcessor::new(settings)?;
    let report = processor.evict(max_age);

    println!(
        "Removed {} preview(s) from {}",
        report.removed,
        processor.preview_dir().display()
    );
    if report.failed > 0 {
        warn!("{} preview(s) could not be removed", report.failed);
    }
    Ok(())
}

/// Print a derived output filename.
pub fn filename(name: &str, effects: EffectArgs, format: AudioFormat) -> Result<()> {
    let effects = effects.to_settings()?;
    println!(
        "{}",
        derive_output_filename(name, effects.pitch_semitones, effects.speed_factor, format)
    );
    Ok(())
}

/// Extract a clip and print where it was saved.
pub fn import_clip(
    settings: &Settings,
    url: &str,
    start: &str,
    end: &str,
    output_dir: &Path,
) -> Result<()> {
    let tracker = Arc::new(Mutex::new(ProgressTracker::default()));
    let extractor = YtDlpExtractor::new(&settings.yt_dlp_path).with_progress(tracker);
    let request = ClipRequest::new(url, start, end, output_dir).with_task_id("cli");

    let path = extractor.extract(&request)?;

    println!("{}", path.display());
    Ok(())
}

/// Output format implied by the file extension. An unrecognized extension is
/// rejected rather than silently rendered as WAV.
fn format_from_extension(output: &Path) -> Result<AudioFormat> {
    match output.extension() {
        Some(ext) => ext.to_string_lossy().parse(),
        None => {
            let format = AudioFormat::default();
            warn!("{} has no extension, rendering as {}", output.display(), format);
            Ok(format)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("out.mp3", AudioFormat::Mp3 ; "mp3")]
    #[test_case("out.FLAC", AudioFormat::Flac ; "uppercase")]
    #[test_case("out", AudioFormat::Wav ; "no extension")]
    fn test_format_from_extension(path: &str, expected: AudioFormat) {
        assert_eq!(format_from_extension(Path::new(path)).unwrap(), expected);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = format_from_extension(Path::new("renders/out.aiff")).unwrap_err();

        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(err.to_string().contains("aiff"), "{}", err);
    }

    #[test]
    fn test_render_to_unknown_extension_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("out.aiff");
        let settings = Settings {
            preview_directory: temp.path().join("previews"),
            ..Default::default()
        };

        let result = render(
            &settings,
            &temp.path().join("missing.wav"),
            &output,
            EffectArgs { pitch: 0.0, speed: 1.0 },
            None,
            QualityArgs::default(),
        );

        assert_eq!(result.unwrap_err().error_code(), "INVALID_PARAMETER");
        assert!(!output.exists());
    }
}
