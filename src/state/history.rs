//! Generation history for a project
//!
//! Each project keeps a flat `history.json` array of entries, one per
//! generated or processed clip. Audio paths are relative to the project
//! directory.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::{Result, VoiceboxError};

/// Name of the history file inside a project directory
pub const HISTORY_FILE: &str = "history.json";

/// One generated or processed clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    pub script_text: String,
    /// Audio file relative to the project directory
    pub audio_path: String,
    pub created_at: DateTime<Utc>,
    /// Character name to voice id
    #[serde(default)]
    pub character_mappings: BTreeMap<String, String>,
    /// Entry this one was derived from by post-processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_from: Option<String>,
}

impl HistoryEntry {
    /// Create an entry with a fresh id and the current time
    pub fn create(
        name: impl Into<String>,
        script_text: impl Into<String>,
        audio_path: impl Into<String>,
        character_mappings: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            script_text: script_text.into(),
            audio_path: audio_path.into(),
            created_at: Utc::now(),
            character_mappings,
            processed_from: None,
        }
    }
}

/// Lookup and append access to a project's history
pub trait HistoryStore {
    /// Find an entry by id
    fn get(&self, id: &str) -> Result<Option<HistoryEntry>>;

    /// Append an entry
    fn save(&mut self, entry: HistoryEntry) -> Result<()>;
}

/// History persisted as `<project>/history.json`
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    project_dir: PathBuf,
    history_file: PathBuf,
}

impl JsonHistoryStore {
    /// Open the history of a project, creating an empty `history.json` when
    /// the project has none yet.
    pub fn open(project_dir: &Path) -> Result<Self> {
        let history_file = project_dir.join(HISTORY_FILE);

        if !history_file.exists() {
            fs::create_dir_all(project_dir).map_err(|e| VoiceboxError::DirectoryCreateError {
                path: project_dir.to_path_buf(),
                source: e,
            })?;
            fs::write(&history_file, "[]").map_err(|e| VoiceboxError::FileWriteError {
                path: history_file.clone(),
                source: e,
            })?;
        }

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            history_file,
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// All entries, oldest first
    pub fn list(&self) -> Result<Vec<HistoryEntry>> {
        let content =
            fs::read_to_string(&self.history_file).map_err(|e| VoiceboxError::FileReadError {
                path: self.history_file.clone(),
                source: e,
            })?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Change an entry's display name
    pub fn rename(&mut self, id: &str, name: &str) -> Result<HistoryEntry> {
        let mut entries = self.list()?;
        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| not_found(id))?;
        entry.name = name.to_string();
        let renamed = entry.clone();

        self.write_all(&entries)?;
        info!("Renamed history entry {} to '{}'", id, name);
        Ok(renamed)
    }

    /// Remove an entry and, best effort, its audio file
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let mut entries = self.list()?;
        let position = entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| not_found(id))?;
        let removed = entries.remove(position);

        let audio = self.project_dir.join(&removed.audio_path);
        if audio.exists() {
            if let Err(e) = fs::remove_file(&audio) {
                warn!("Failed to delete audio file {}: {}", audio.display(), e);
            }
        }

        self.write_all(&entries)?;
        info!("Deleted history entry {}", id);
        Ok(())
    }

    fn write_all(&self, entries: &[HistoryEntry]) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let write_error = |source: std::io::Error| VoiceboxError::FileWriteError {
            path: self.history_file.clone(),
            source,
        };

        let mut staged = NamedTempFile::new_in(&self.project_dir).map_err(write_error)?;
        staged.write_all(content.as_bytes()).map_err(write_error)?;
        staged
            .persist(&self.history_file)
            .map_err(|e| write_error(e.error))?;
        Ok(())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn get(&self, id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self.list()?.into_iter().find(|entry| entry.id == id))
    }

    fn save(&mut self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.list()?;
        let id = entry.id.clone();
        entries.push(entry);
        self.write_all(&entries)?;
        info!("Saved history entry {}", id);
        Ok(())
    }
}

fn not_found(id: &str) -> VoiceboxError {
    VoiceboxError::HistoryEntryNotFound { id: id.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn entry(name: &str, audio: &str) -> HistoryEntry {
        let mut mappings = BTreeMap::new();
        mappings.insert("Narrator".to_string(), "voice-1".to_string());
        HistoryEntry::create(name, "Hello there.", audio, mappings)
    }

    #[test]
    fn test_open_creates_empty_history() {
        let temp = tempdir().unwrap();
        let project = temp.path().join("project");

        let store = JsonHistoryStore::open(&project).unwrap();

        assert_eq!(fs::read_to_string(project.join(HISTORY_FILE)).unwrap(), "[]");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let a = entry("a", "a.wav");
        let b = entry("b", "b.wav");
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
        assert_eq!(a.processed_from, None);
    }

    #[test]
    fn test_save_get_and_list_order() {
        let temp = tempdir().unwrap();
        let mut store = JsonHistoryStore::open(temp.path()).unwrap();
        let first = entry("first", "first.wav");
        let second = entry("second", "second.wav");

        store.save(first.clone()).unwrap();
        store.save(second.clone()).unwrap();

        assert_eq!(store.get(&second.id).unwrap(), Some(second));
        let names: Vec<_> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_rename() {
        let temp = tempdir().unwrap();
        let mut store = JsonHistoryStore::open(temp.path()).unwrap();
        let original = entry("take 1", "take.wav");
        store.save(original.clone()).unwrap();

        let renamed = store.rename(&original.id, "final take").unwrap();

        assert_eq!(renamed.name, "final take");
        assert_eq!(store.get(&original.id).unwrap().unwrap().name, "final take");
        assert!(matches!(
            store.rename("missing", "x"),
            Err(VoiceboxError::HistoryEntryNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_removes_audio() {
        let temp = tempdir().unwrap();
        let mut store = JsonHistoryStore::open(temp.path()).unwrap();
        fs::create_dir(temp.path().join("audio")).unwrap();
        fs::write(temp.path().join("audio").join("clip.wav"), b"RIFF").unwrap();
        let kept = entry("kept", "audio/other.wav");
        let doomed = entry("doomed", "audio/clip.wav");
        store.save(kept.clone()).unwrap();
        store.save(doomed.clone()).unwrap();

        store.delete(&doomed.id).unwrap();

        assert!(!temp.path().join("audio").join("clip.wav").exists());
        assert_eq!(store.list().unwrap(), vec![kept]);
    }

    #[test]
    fn test_delete_tolerates_missing_audio() {
        let temp = tempdir().unwrap();
        let mut store = JsonHistoryStore::open(temp.path()).unwrap();
        let orphan = entry("orphan", "audio/gone.wav");
        store.save(orphan.clone()).unwrap();

        store.delete(&orphan.id).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_entries_without_optional_fields_load() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join(HISTORY_FILE),
            r#"[{"id": "abc", "name": "n", "script_text": "s", "audio_path": "a.wav",
                "created_at": "2024-01-15T12:00:00Z"}]"#,
        )
        .unwrap();

        let store = JsonHistoryStore::open(temp.path()).unwrap();
        let loaded = store.get("abc").unwrap().unwrap();

        assert!(loaded.character_mappings.is_empty());
        assert_eq!(loaded.processed_from, None);
    }
}
