//! Persistent and in-memory state
//!
//! - `history`: per-project generation history stored as JSON
//! - `progress`: bounded progress tracking for background tasks

pub mod history;
pub mod progress;

pub use history::{HistoryEntry, HistoryStore, JsonHistoryStore, HISTORY_FILE};
pub use progress::ProgressTracker;
