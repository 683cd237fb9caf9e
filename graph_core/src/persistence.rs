//! Persistence of the view state across restarts.
//!
//! Only the selection, view mode, active layers and performance override are
//! stored. History and the visible node count always start empty.

use game_model::Entity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PersistError;
use crate::layers::IntelligenceLayer;
use crate::performance::PerformanceMode;
use crate::selection::ViewMode;

/// Storage key for the view snapshot.
pub const VIEW_STATE_KEY: &str = "graph_core.view";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedView {
    pub selected: Option<Entity>,
    pub view_mode: ViewMode,
    pub active_layers: Vec<IntelligenceLayer>,
    pub performance_override: Option<PerformanceMode>,
}

impl PersistedView {
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(PersistError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, PersistError> {
        serde_json::from_str(raw).map_err(PersistError::Decode)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), PersistError> {
        store.set(VIEW_STATE_KEY, self.to_json()?)
    }

    /// Load the stored view, or `None` if nothing was stored.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, PersistError> {
        store
            .get(VIEW_STATE_KEY)?
            .map(|raw| Self::from_json(&raw))
            .transpose()
    }
}

/// String key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), PersistError>;
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(PersistError::Decode),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(source) => Err(PersistError::Storage {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        let raw = serde_json::to_string_pretty(&entries).map_err(PersistError::Encode)?;
        fs::write(&self.path, raw).map_err(|source| PersistError::Storage {
            path: self.path.clone(),
            source,
        })
    }
}
