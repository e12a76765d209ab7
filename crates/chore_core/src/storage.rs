use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::board::ChoreBoard;
use crate::chore::{ChoreId, ChoreRegistry};
use crate::completion::CompletionRecord;
use crate::error::{ChoreError, Result};

pub const DEFAULT_STORAGE_KEY: &str = "chores_state_v1";

/// Key-value blob storage. Implementations hold a single writer's state.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(ChoreError::InvalidRequest(format!(
                "storage key `{key}` must be alphanumeric"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        // Readers never see a half-written blob.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.write().insert(key.into(), value.into());
        self
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Reads and writes the whole board as one blob under a fixed key.
pub struct Persistence {
    store: Box<dyn StateStore>,
    key: String,
}

impl Persistence {
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(store: Box<dyn StateStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Restores the saved board, or the seeded defaults when nothing usable is stored.
    /// Each section recovers independently, and completions from any day other than
    /// `today` are discarded.
    pub fn load(&self, today: NaiveDate) -> ChoreBoard {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(key = %self.key, "no saved board, seeding defaults");
                return ChoreBoard::seeded(today);
            }
            Err(err) => {
                warn!(key = %self.key, %err, "unable to read saved board, seeding defaults");
                return ChoreBoard::seeded(today);
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %self.key, %err, "saved board is not json, seeding defaults");
                return ChoreBoard::seeded(today);
            }
        };

        let mut board = ChoreBoard::new(
            section(&value, "chores")
                .map(ChoreRegistry::new)
                .unwrap_or_else(|| ChoreRegistry::seeded(today)),
            section(&value, "plan")
                .map(|ids: Vec<ChoreId>| ids.into_iter().collect())
                .unwrap_or_default(),
            section(&value, "completed")
                .map(|records: Vec<CompletionRecord>| records.into_iter().collect())
                .unwrap_or_default(),
        );
        let stale = board.normalize(today);
        if stale > 0 {
            debug!(stale, "dropped completions from earlier days");
        }
        info!(
            chores = board.chores.len(),
            planned = board.plan.len(),
            completed = board.completions.len(),
            "board restored"
        );
        board
    }

    /// Overwrites whatever was stored before.
    pub fn save(&self, board: &ChoreBoard) -> Result<()> {
        let blob = serde_json::to_string(board)?;
        self.store.set(&self.key, &blob)?;
        debug!(key = %self.key, bytes = blob.len(), "board saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }
}

/// Reads the array stored under `name` one element at a time, skipping elements that
/// do not parse. `None` when the key is missing or does not hold an array.
fn section<T: DeserializeOwned>(value: &Value, name: &str) -> Option<Vec<T>> {
    let Some(entries) = value.get(name).and_then(Value::as_array) else {
        if value.get(name).is_some() {
            warn!(section = name, "discarding section that is not a list");
        }
        return None;
    };
    let parsed = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match T::deserialize(entry) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(section = name, index, %err, "skipping unreadable entry");
                None
            }
        })
        .collect();
    Some(parsed)
}
