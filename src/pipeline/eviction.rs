//! Eviction sweep for preview artifacts
//!
//! Previews are disposable, so the sweep never fails: every problem is
//! logged and counted, and the sweep moves on to the next file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use walkdir::WalkDir;

/// Prefix of preview artifact filenames
pub const PREVIEW_PREFIX: &str = "preview_";

/// Extension of preview artifact filenames
pub const PREVIEW_EXTENSION: &str = ".wav";

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Files deleted by this sweep
    pub removed: usize,
    /// Files that were stale but could not be inspected or deleted
    pub failed: usize,
}

/// Whether a filename is a preview artifact: `preview_<digits>.wav`
pub fn is_preview_file_name(name: &str) -> bool {
    name.strip_prefix(PREVIEW_PREFIX)
        .and_then(|rest| rest.strip_suffix(PREVIEW_EXTENSION))
        .map(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Delete preview artifacts in `dir` last modified more than `max_age` ago.
///
/// Only direct children matching `preview_<digits>.wav` are considered.
/// Files removed concurrently by another sweep are skipped silently.
pub fn evict_stale_previews(dir: &Path, max_age: Duration) -> EvictionReport {
    let mut report = EvictionReport::default();

    if !dir.exists() {
        debug!("Preview directory {} does not exist, nothing to evict", dir.display());
        return report;
    }

    let cutoff = match SystemTime::now().checked_sub(max_age) {
        Some(cutoff) => cutoff,
        None => return report,
    };

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to list preview directory {}: {}", dir.display(), e);
                report.failed += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_preview_file_name(&entry.file_name().to_string_lossy())
        {
            continue;
        }

        let modified = match last_modified(entry.path()) {
            Inspection::Modified(modified) => modified,
            Inspection::Gone => continue,
            Inspection::Failed => {
                report.failed += 1;
                continue;
            }
        };

        if modified >= cutoff {
            continue;
        }

        match remove_preview(entry.path()) {
            Removal::Removed => report.removed += 1,
            Removal::AlreadyGone => {}
            Removal::Failed => report.failed += 1,
        }
    }

    if report.removed > 0 || report.failed > 0 {
        info!(
            "Evicted {} preview(s) from {} ({} failed)",
            report.removed,
            dir.display(),
            report.failed
        );
    }

    report
}

#[derive(Debug, PartialEq, Eq)]
enum Inspection {
    Modified(SystemTime),
    Gone,
    Failed,
}

fn last_modified(path: &Path) -> Inspection {
    match fs::metadata(path).and_then(|metadata| metadata.modified()) {
        Ok(modified) => Inspection::Modified(modified),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Preview {} removed before inspection", path.display());
            Inspection::Gone
        }
        Err(e) => {
            warn!("Failed to read mtime of {}: {}", path.display(), e);
            Inspection::Failed
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Removal {
    Removed,
    AlreadyGone,
    Failed,
}

fn remove_preview(path: &Path) -> Removal {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale preview {}", path.display());
            Removal::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Preview {} already removed", path.display());
            Removal::AlreadyGone
        }
        Err(e) => {
            warn!("Failed to remove preview {}: {}", path.display(), e);
            Removal::Failed
        }
    }
}
