//! Progress of long-running background tasks
//!
//! A bounded map from task id to percent complete. Entries expire after a
//! fixed time without updates, and inserting past capacity drops the entry
//! that was updated longest ago, so abandoned tasks never accumulate.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

/// Default number of tracked tasks
pub const DEFAULT_CAPACITY: usize = 64;

/// Default time an entry lives without updates
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct ProgressEntry {
    percent: f32,
    updated_at: Instant,
    /// Update order, used to pick the stalest entry deterministically
    sequence: u64,
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, ProgressEntry>,
    next_sequence: u64,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl ProgressTracker {
    /// Create a tracker holding at most `capacity` tasks (minimum one)
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
            next_sequence: 0,
        }
    }

    /// Record progress for a task. The percent is clamped to 0-100.
    pub fn update(&mut self, task_id: &str, percent: f32) {
        if !self.entries.contains_key(task_id) && self.entries.len() >= self.capacity {
            self.purge_expired();
            if self.entries.len() >= self.capacity {
                self.evict_stalest();
            }
        }

        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.entries.insert(
            task_id.to_string(),
            ProgressEntry {
                percent,
                updated_at: Instant::now(),
                sequence,
            },
        );
    }

    /// Last reported percent, or `None` for unknown or expired tasks
    pub fn get(&self, task_id: &str) -> Option<f32> {
        self.entries
            .get(task_id)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.percent)
    }

    /// Stop tracking a task, returning its last percent
    pub fn remove(&mut self, task_id: &str) -> Option<f32> {
        self.entries.remove(task_id).map(|entry| entry.percent)
    }

    /// Drop expired entries, returning how many were dropped
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.updated_at.elapsed() < ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!("Purged {} expired progress entries", purged);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &ProgressEntry) -> bool {
        entry.updated_at.elapsed() >= self.ttl
    }

    fn evict_stalest(&mut self) {
        let stalest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.sequence)
            .map(|(id, _)| id.clone());

        if let Some(id) = stalest {
            debug!("Progress tracker full, dropping task {}", id);
            self.entries.remove(&id);
        }
    }
}
