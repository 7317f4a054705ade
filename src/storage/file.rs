use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::KeyValueStore;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Key-value pairs persisted as a flat JSON object on disk.
///
/// A missing file is an empty store. Removing the last key deletes the file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store backed by `session.json` inside `cache_dir`
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self::at(cache_dir.as_ref().join(SESSION_FILE))
    }

    /// Store backed by an explicit file path
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(Some(contents))
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match self.read()? {
            Some(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", self.path.display())),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Entries to modify. Read failures propagate; a file that reads fine
    /// but isn't valid JSON is replaced.
    fn load_for_update(&self) -> Result<BTreeMap<String, String>> {
        let Some(contents) = self.read()? else {
            return Ok(BTreeMap::new());
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Discarding corrupt session file");
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)
                    .with_context(|| format!("Failed to remove {}", self.path.display()))?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                warn!(error = %e, "Session file unreadable, treating as empty");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)?;
        debug!(key, path = %self.path.display(), "Stored session key");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load_for_update()?;
        entries.remove(key);
        self.save(&entries)?;
        debug!(key, "Removed session key");
        Ok(())
    }
}
