//! Usage counter persisted in a key-value store.
//!
//! DESIGN
//! ======
//! The counter is read once when the studio starts and written back on every
//! change. Storage failures are logged and otherwise ignored: losing a count
//! is never worth failing a generation over.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::lock;

/// Storage key of the counter.
pub const USAGE_COUNT_KEY: &str = "gemini_usage_count";

/// Percent of the progress bar each generation fills.
const PROGRESS_STEP: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns a [`StoreError`] when the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// A flat JSON object on disk, rewritten whole on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or corrupt one is logged and treated as empty.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "store: corrupt state file, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "store: unreadable state file, starting empty");
                BTreeMap::new()
            }
        };
        Self { path, entries: Mutex::new(entries) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let raw = {
            let mut entries = lock(&self.entries);
            entries.insert(key.to_string(), value.to_string());
            serde_json::to_string_pretty(&*entries)?
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

// =============================================================================
// USAGE COUNTER
// =============================================================================

/// Number of successful generations, persisted under [`USAGE_COUNT_KEY`].
pub struct UsageCounter {
    count: u64,
    store: std::sync::Arc<dyn KeyValueStore>,
}

impl UsageCounter {
    /// Read the persisted value once. Missing or unparsable values start at 0.
    #[must_use]
    pub fn load(store: std::sync::Arc<dyn KeyValueStore>) -> Self {
        let count = store.get(USAGE_COUNT_KEY).map_or(0, |raw| parse_count(&raw));
        debug!(count, "usage: loaded");
        Self { count, store }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Progress bar fill: 5% per generation, capped at 100.
    #[must_use]
    pub fn progress_percent(&self) -> u64 {
        self.count.saturating_mul(PROGRESS_STEP).min(100)
    }

    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
        self.persist();
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.store.set(USAGE_COUNT_KEY, &self.count.to_string()) {
            warn!(error = %e, count = self.count, "usage: persist failed");
        }
    }
}

/// Leading decimal digits of `raw`; anything else counts as 0.
fn parse_count(raw: &str) -> u64 {
    let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
#[path = "usage_test.rs"]
mod tests;
