/// Release notes and "what's new" detection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use thiserror::Error;

use crate::core::storage::{KeyValueStore, Preferences, StorageError};

#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangelogEntry {
    pub version: String,
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    entries: Vec<ChangelogEntry>,
}

/// Parse "x.y.z" leniently: missing or non-numeric parts count as 0, and a
/// leading "v" is ignored.
fn version_key(version: &str) -> (u64, u64, u64) {
    let mut parts = version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|p| p.trim().parse::<u64>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    version_key(a).cmp(&version_key(b))
}

impl Changelog {
    pub fn new(mut entries: Vec<ChangelogEntry>) -> Self {
        entries.sort_by(|a, b| compare_versions(&b.version, &a.version));
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, ChangelogError> {
        let entries: Vec<ChangelogEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn load(path: &Path) -> Result<Self, ChangelogError> {
        let json = std::fs::read_to_string(path).map_err(|source| ChangelogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[ChangelogEntry] {
        &self.entries
    }

    pub fn latest_version(&self) -> Option<&str> {
        self.entries.first().map(|e| e.version.as_str())
    }

    /// Entries newer than `version`, newest first. With no version every
    /// entry is new.
    pub fn entries_since(&self, version: Option<&str>) -> Vec<&ChangelogEntry> {
        match version {
            Some(seen) => self
                .entries
                .iter()
                .filter(|e| compare_versions(&e.version, seen) == Ordering::Greater)
                .collect(),
            None => self.entries.iter().collect(),
        }
    }

    /// Entries the user has not seen yet, up to `current`. Records `current`
    /// as seen.
    pub fn whats_new<S: KeyValueStore>(
        &self,
        prefs: &mut Preferences<S>,
        current: &str,
    ) -> Result<Vec<ChangelogEntry>, ChangelogError> {
        let seen = prefs.last_seen_version();
        let unseen: Vec<ChangelogEntry> = self
            .entries_since(seen.as_deref())
            .into_iter()
            .filter(|e| compare_versions(&e.version, current) != Ordering::Greater)
            .cloned()
            .collect();
        if seen.as_deref() != Some(current) {
            prefs.set_last_seen_version(current)?;
            tracing::info!("{} unseen changelog entries up to {}", unseen.len(), current);
        }
        Ok(unseen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStore;

    fn changelog() -> Changelog {
        Changelog::from_json(
            r#"[
                {"version": "0.1.0", "changes": ["First release"]},
                {"version": "0.3.0", "changes": ["Undo and redo"]},
                {"version": "0.2.10", "changes": ["HTML export"]},
                {"version": "0.2.2", "changes": ["Dangers"]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn sorted_newest_first() {
        let log = changelog();
        let versions: Vec<&str> = log.entries().iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["0.3.0", "0.2.10", "0.2.2", "0.1.0"]);
        assert_eq!(log.latest_version(), Some("0.3.0"));
    }

    #[test]
    fn numeric_comparison() {
        assert_eq!(compare_versions("0.2.10", "0.2.9"), Ordering::Greater);
        assert_eq!(compare_versions("v1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn entries_since_filters_older() {
        let log = changelog();
        let since: Vec<&str> = log
            .entries_since(Some("0.2.2"))
            .iter()
            .map(|e| e.version.as_str())
            .collect();
        assert_eq!(since, vec!["0.3.0", "0.2.10"]);
        assert_eq!(log.entries_since(None).len(), 4);
        assert!(log.entries_since(Some("9.0.0")).is_empty());
    }

    #[test]
    fn whats_new_records_version() {
        let log = changelog();
        let mut prefs = Preferences::new(MemoryStore::new());
        prefs.set_last_seen_version("0.2.10").unwrap();

        let fresh = log.whats_new(&mut prefs, "0.3.0").unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].changes, vec!["Undo and redo".to_string()]);
        assert_eq!(prefs.last_seen_version().as_deref(), Some("0.3.0"));

        assert!(log.whats_new(&mut prefs, "0.3.0").unwrap().is_empty());
    }

    #[test]
    fn whats_new_ignores_future_entries() {
        let log = changelog();
        let mut prefs = Preferences::new(MemoryStore::new());
        let fresh = log.whats_new(&mut prefs, "0.2.2").unwrap();
        let versions: Vec<&str> = fresh.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["0.2.2", "0.1.0"]);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Changelog::from_json(r#"[{"version": "1.0.0", "changes": [], "date": "x"}]"#).is_err());
    }
}
