//! Key-value persistence for user preferences and saved encounters.
//!
//! [`KeyValueStore`] is the seam: the CLI uses a JSON file on disk, the
//! browser build and tests use [`MemoryStore`]. Values are JSON strings, and
//! a value that fails to parse is treated as absent.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::core::generator::GeneratedEncounter;

pub const THEME_KEY: &str = "loreweaver.theme";
pub const SAVED_ENCOUNTERS_KEY: &str = "loreweaver.saved_encounters";
pub const LAST_SEEN_VERSION_KEY: &str = "loreweaver.last_seen_version";
pub const PROGRESSIVE_REVEAL_KEY: &str = "loreweaver.progressive_reveal";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
    #[error("unknown theme '{0}' (expected light, dark or system)")]
    UnknownTheme(String),
}

/// Replace `path` with `data` through a temp file in the same directory.
/// Creates missing parent directories.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(data)?;
    temp.persist(path).map_err(|source| StorageError::Persist {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// String key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Vec<String>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// A store persisted as a single JSON object file.
///
/// Every write rewrites the file atomically (temp file in the same
/// directory, then rename).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// or corrupt file is logged and also starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt store {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Could not read store {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &data)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    /// On a failed write the in-memory map is restored to match disk.
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let previous = self.entries.insert(key.to_string(), value);
        if let Err(e) = self.flush() {
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if let Some(old) = self.entries.remove(key) {
            if let Err(e) = self.flush() {
                self.entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        })
    }
}

impl FromStr for Theme {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            _ => Err(StorageError::UnknownTheme(s.to_string())),
        }
    }
}

/// An encounter the user chose to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEncounter {
    pub id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub label: String,
    pub encounter: GeneratedEncounter,
}

/// Typed access to the application's keys on top of any store.
#[derive(Debug)]
pub struct Preferences<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring corrupt value for {}: {}", key, e);
                None
            }
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw)
    }

    pub fn theme(&self) -> Theme {
        self.get_json(THEME_KEY).unwrap_or_default()
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StorageError> {
        self.set_json(THEME_KEY, &theme)
    }

    pub fn progressive_reveal(&self) -> bool {
        self.get_json(PROGRESSIVE_REVEAL_KEY).unwrap_or(false)
    }

    pub fn set_progressive_reveal(&mut self, enabled: bool) -> Result<(), StorageError> {
        self.set_json(PROGRESSIVE_REVEAL_KEY, &enabled)
    }

    pub fn last_seen_version(&self) -> Option<String> {
        self.get_json(LAST_SEEN_VERSION_KEY)
    }

    pub fn set_last_seen_version(&mut self, version: &str) -> Result<(), StorageError> {
        self.set_json(LAST_SEEN_VERSION_KEY, &version)
    }

    /// Saved encounters, oldest first.
    pub fn saved_encounters(&self) -> Vec<SavedEncounter> {
        self.get_json(SAVED_ENCOUNTERS_KEY).unwrap_or_default()
    }

    /// Save an encounter. The label defaults to the encounter title.
    pub fn save_encounter(
        &mut self,
        encounter: &GeneratedEncounter,
        label: Option<&str>,
    ) -> Result<SavedEncounter, StorageError> {
        let saved = SavedEncounter {
            id: Uuid::new_v4(),
            saved_at: Utc::now(),
            label: label.unwrap_or(&encounter.title).to_string(),
            encounter: encounter.clone(),
        };
        let mut all = self.saved_encounters();
        all.push(saved.clone());
        self.set_json(SAVED_ENCOUNTERS_KEY, &all)?;
        tracing::info!("Saved encounter '{}' ({})", saved.label, saved.id);
        Ok(saved)
    }

    /// Look up a saved encounter by full id or unambiguous id prefix.
    pub fn find_saved(&self, id_or_prefix: &str) -> Option<SavedEncounter> {
        let needle = id_or_prefix.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let mut matches: Vec<SavedEncounter> = self
            .saved_encounters()
            .into_iter()
            .filter(|s| s.id.to_string().starts_with(&needle))
            .collect();
        if matches.len() == 1 {
            matches.pop()
        } else {
            None
        }
    }

    /// Returns false when no saved encounter had that id.
    pub fn remove_saved(&mut self, id: Uuid) -> Result<bool, StorageError> {
        let mut all = self.saved_encounters();
        let before = all.len();
        all.retain(|s| s.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.set_json(SAVED_ENCOUNTERS_KEY, &all)?;
        Ok(true)
    }

    pub fn clear_saved(&mut self) -> Result<(), StorageError> {
        self.store.remove(SAVED_ENCOUNTERS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::sample_encounter;
    use tempfile::tempdir;

    #[test]
    fn defaults_when_empty() {
        let prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.theme(), Theme::System);
        assert!(!prefs.progressive_reveal());
        assert_eq!(prefs.last_seen_version(), None);
        assert!(prefs.saved_encounters().is_empty());
    }

    #[test]
    fn typed_values_round_trip() {
        let mut prefs = Preferences::new(MemoryStore::new());
        prefs.set_theme(Theme::Dark).unwrap();
        prefs.set_progressive_reveal(true).unwrap();
        prefs.set_last_seen_version("0.3.0").unwrap();

        assert_eq!(prefs.theme(), Theme::Dark);
        assert!(prefs.progressive_reveal());
        assert_eq!(prefs.last_seen_version().as_deref(), Some("0.3.0"));
        assert_eq!(prefs.store().get(THEME_KEY).as_deref(), Some("\"dark\""));
    }

    #[test]
    fn corrupt_value_treated_as_absent() {
        let mut store = MemoryStore::new();
        store.set(THEME_KEY, "{{nope".to_string()).unwrap();
        store.set(SAVED_ENCOUNTERS_KEY, "[1, 2".to_string()).unwrap();
        let prefs = Preferences::new(store);
        assert_eq!(prefs.theme(), Theme::System);
        assert!(prefs.saved_encounters().is_empty());
    }

    #[test]
    fn save_find_remove_encounters() {
        let mut prefs = Preferences::new(MemoryStore::new());
        let enc = sample_encounter();

        let first = prefs.save_encounter(&enc, None).unwrap();
        let second = prefs.save_encounter(&enc, Some("Session 4 opener")).unwrap();
        assert_eq!(first.label, enc.title);
        assert_eq!(second.label, "Session 4 opener");
        assert_eq!(prefs.saved_encounters().len(), 2);

        let prefix = &first.id.to_string()[..8];
        assert_eq!(prefs.find_saved(prefix).map(|s| s.id), Some(first.id));
        assert!(prefs.find_saved("").is_none());

        assert!(prefs.remove_saved(first.id).unwrap());
        assert!(!prefs.remove_saved(first.id).unwrap());
        assert_eq!(prefs.saved_encounters(), vec![second]);

        prefs.clear_saved().unwrap();
        assert!(prefs.saved_encounters().is_empty());
    }

    #[test]
    fn theme_parsing() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = FileStore::open(&path);
        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();
        store.remove("a").unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("a"), None);
        assert_eq!(reopened.get("b").as_deref(), Some("2"));
        assert_eq!(reopened.keys(), vec!["b".to_string()]);
    }

    #[test]
    fn file_store_keeps_memory_in_sync_on_failed_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = FileStore::open(&path);
        store.set("k", "old".to_string()).unwrap();

        // Swap the file for a directory so the rename fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.set("k", "new".to_string()).is_err());
        assert_eq!(store.get("k").as_deref(), Some("old"));
        assert!(store.set("fresh", "1".to_string()).is_err());
        assert_eq!(store.get("fresh"), None);
        assert!(store.remove("k").is_err());
        assert_eq!(store.get("k").as_deref(), Some("old"));
    }

    #[test]
    fn file_store_ignores_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let mut store = FileStore::open(&path);
        assert!(store.keys().is_empty());
        store.set("k", "v".to_string()).unwrap();
        assert_eq!(FileStore::open(&path).get("k").as_deref(), Some("v"));
    }
}
