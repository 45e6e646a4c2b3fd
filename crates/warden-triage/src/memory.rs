//! Bounded problem/solution memory
//!
//! Keys are normalized error text; each key holds the most recent
//! [`MAX_ENTRIES_PER_KEY`] entries. Persistence is whole-store
//! read-modify-write JSON, acceptable at this bounded scale.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maximum retained entries per problem key; oldest are dropped
pub const MAX_ENTRIES_PER_KEY: usize = 10;

/// A recorded pairing of a past problem and the remedy applied to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionEntry {
    /// Normalized problem key this entry is filed under
    pub problem_key: String,
    /// The remedy that was attempted
    pub solution: String,
    /// Whether the remedy actually resolved the problem
    pub succeeded: bool,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

/// Errors raised by the solution store
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Store file could not be read or written
    #[error("solution store io failure: {0}")]
    Io(#[from] std::io::Error),

    /// Store file exists but does not parse
    #[error("solution store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persisted, bounded map of problem keys to solution history
pub struct SolutionMemory {
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, Vec<SolutionEntry>>>,
}

impl SolutionMemory {
    /// Volatile store with no backing file
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store backed by `path`, loading existing contents if present
    ///
    /// # Errors
    /// Returns [`MemoryError`] if an existing store cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Normalize raw problem text into a store key
    ///
    /// Lowercases and collapses whitespace runs to single underscores.
    #[must_use]
    pub fn normalize_key(raw: &str) -> String {
        raw.to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Record a solution attempt under `problem_key`
    ///
    /// Appends, truncates the key's history to the most recent
    /// [`MAX_ENTRIES_PER_KEY`] entries, and persists the whole store.
    ///
    /// # Errors
    /// Returns [`MemoryError::Io`] if the backing file cannot be written.
    pub fn save(
        &self,
        problem_key: &str,
        solution: impl Into<String>,
        succeeded: bool,
    ) -> Result<(), MemoryError> {
        let key = Self::normalize_key(problem_key);
        let entry = SolutionEntry {
            problem_key: key.clone(),
            solution: solution.into(),
            succeeded,
            timestamp: Utc::now(),
        };

        let mut guard = self.entries.lock();
        let history = guard.entry(key).or_default();
        history.push(entry);
        if history.len() > MAX_ENTRIES_PER_KEY {
            let excess = history.len() - MAX_ENTRIES_PER_KEY;
            history.drain(..excess);
        }

        self.persist(&guard)
    }

    /// Full history for `problem_key` (normalized), most recent last
    #[must_use]
    pub fn get(&self, problem_key: &str) -> Vec<SolutionEntry> {
        let key = Self::normalize_key(problem_key);
        self.entries.lock().get(&key).cloned().unwrap_or_default()
    }

    /// The most recent succeeded entry for `problem_key`, if any
    #[must_use]
    pub fn latest_succeeded(&self, problem_key: &str) -> Option<SolutionEntry> {
        self.get(problem_key)
            .into_iter()
            .rev()
            .find(|e| e.succeeded)
    }

    /// All problem keys currently held
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    fn persist(&self, entries: &HashMap<String, Vec<SolutionEntry>>) -> Result<(), MemoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
