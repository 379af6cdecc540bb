//! Post-processing of history entries
//!
//! Renders an existing history entry with effects into the project's
//! `outputs/` directory and records the result as a new entry that points
//! back at its source.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoiceboxError};
use crate::pipeline::{AudioProcessor, EffectSettings, ProcessedOutputMetadata};
use crate::render::{derive_output_filename, EncodeProfile};
use crate::state::{HistoryEntry, HistoryStore};

/// Directory under the project that receives processed renders
pub const OUTPUTS_DIR: &str = "outputs";

/// Result of processing a history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Output file relative to the project directory, e.g. `outputs/voice_p3.0.wav`
    pub processed_file_path: String,
    pub metadata: ProcessedOutputMetadata,
    /// Id of the history entry created for the output
    pub history_id: String,
}

/// Render `entry_id` with `effects` and record it as a new history entry.
///
/// # Errors
/// * `HistoryEntryNotFound` - If `entry_id` is not in the store
/// * Any error of [`AudioProcessor::render`]
pub fn process_history_entry<S: HistoryStore + ?Sized>(
    processor: &AudioProcessor,
    store: &mut S,
    project_dir: &Path,
    entry_id: &str,
    effects: &EffectSettings,
    profile: EncodeProfile,
) -> Result<ProcessOutcome> {
    let entry = store
        .get(entry_id)?
        .ok_or_else(|| VoiceboxError::HistoryEntryNotFound {
            id: entry_id.to_string(),
        })?;

    let source_path = project_dir.join(&entry.audio_path);
    let original_name = Path::new(&entry.audio_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.audio_path.clone());
    let file_name = derive_output_filename(
        &original_name,
        effects.pitch_semitones,
        effects.speed_factor,
        profile.format(),
    );
    let processed_file_path = format!("{}/{}", OUTPUTS_DIR, file_name);
    let output_path = project_dir.join(OUTPUTS_DIR).join(&file_name);

    let metadata = processor.render(&source_path, effects, profile, &output_path)?;

    let mut processed = HistoryEntry::create(
        format!("{} (processed)", entry.name),
        entry.script_text.clone(),
        processed_file_path.clone(),
        entry.character_mappings.clone(),
    );
    processed.processed_from = Some(entry.id.clone());
    let history_id = processed.id.clone();
    store.save(processed)?;

    info!(
        "Processed history entry {} into {} (new entry {})",
        entry.id, processed_file_path, history_id
    );

    Ok(ProcessOutcome {
        processed_file_path,
        metadata,
        history_id,
    })
}
