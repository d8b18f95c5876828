/// Content library: loading the static JSON tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::schema::danger::Danger;
use crate::schema::encounter::Encounter;
use crate::schema::location::Location;
use crate::schema::npc::NpcTemplate;
use crate::schema::skill_check::SkillCheck;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {kind} table: {source}")]
    Json {
        kind: ContentKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown content kind '{0}'")]
    UnknownKind(String),
}

/// The five content tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Encounter,
    Location,
    Npc,
    SkillCheck,
    Danger,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        Self::Encounter,
        Self::Location,
        Self::Npc,
        Self::SkillCheck,
        Self::Danger,
    ];

    /// File name of the table inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Encounter => "encounters.json",
            Self::Location => "locations.json",
            Self::Npc => "npcs.json",
            Self::SkillCheck => "skill_checks.json",
            Self::Danger => "dangers.json",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Encounter => "encounter",
            Self::Location => "location",
            Self::Npc => "npc",
            Self::SkillCheck => "skill_check",
            Self::Danger => "danger",
        }
    }

    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.file_name())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentKind {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "encounter" | "encounters" => Ok(Self::Encounter),
            "location" | "locations" => Ok(Self::Location),
            "npc" | "npcs" => Ok(Self::Npc),
            "skill_check" | "skill_checks" => Ok(Self::SkillCheck),
            "danger" | "dangers" => Ok(Self::Danger),
            _ => Err(ContentError::UnknownKind(s.to_string())),
        }
    }
}

/// Outcome of loading a data directory: which tables loaded and which failed.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<(ContentKind, usize)>,
    pub failed: Vec<(ContentKind, ContentError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// All content tables held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentLibrary {
    pub encounters: Vec<Encounter>,
    pub locations: Vec<Location>,
    pub npcs: Vec<NpcTemplate>,
    pub skill_checks: Vec<SkillCheck>,
    pub dangers: Vec<Danger>,
}

impl ContentLibrary {
    /// Load every table from `data_dir`.
    ///
    /// A table that is missing or malformed is logged and left empty; the
    /// remaining tables still load. Inspect the returned report to find out
    /// what failed.
    pub fn load_dir(data_dir: &Path) -> (ContentLibrary, LoadReport) {
        let mut library = ContentLibrary::default();
        let mut report = LoadReport::default();

        for kind in ContentKind::ALL {
            let path = kind.path_in(data_dir);
            let result = std::fs::read_to_string(&path)
                .map_err(|source| ContentError::Io {
                    path: path.clone(),
                    source,
                })
                .and_then(|json| library.load_table(kind, &json));

            match result {
                Ok(count) => {
                    tracing::info!("Loaded {} {} records from {}", count, kind, path.display());
                    report.loaded.push((kind, count));
                }
                Err(e) => {
                    tracing::error!("Failed to load {} table: {}", kind, e);
                    report.failed.push((kind, e));
                }
            }
        }

        (library, report)
    }

    /// Load a single table from a data directory, propagating failure.
    pub fn load_table_file(&mut self, kind: ContentKind, data_dir: &Path) -> Result<usize, ContentError> {
        let path = kind.path_in(data_dir);
        let json = std::fs::read_to_string(&path).map_err(|source| ContentError::Io {
            path: path.clone(),
            source,
        })?;
        self.load_table(kind, &json)
    }

    /// Replace one table with records parsed from a JSON array string.
    /// Returns the number of records loaded.
    pub fn load_table(&mut self, kind: ContentKind, json: &str) -> Result<usize, ContentError> {
        let wrap = |source: serde_json::Error| ContentError::Json { kind, source };
        let count = match kind {
            ContentKind::Encounter => {
                self.encounters = serde_json::from_str(json).map_err(wrap)?;
                self.encounters.len()
            }
            ContentKind::Location => {
                self.locations = serde_json::from_str(json).map_err(wrap)?;
                self.locations.len()
            }
            ContentKind::Npc => {
                self.npcs = serde_json::from_str(json).map_err(wrap)?;
                self.npcs.len()
            }
            ContentKind::SkillCheck => {
                self.skill_checks = serde_json::from_str(json).map_err(wrap)?;
                self.skill_checks.len()
            }
            ContentKind::Danger => {
                self.dangers = serde_json::from_str(json).map_err(wrap)?;
                self.dangers.len()
            }
        };
        Ok(count)
    }

    /// Append one record given as JSON. Returns its key.
    pub fn push_record(&mut self, kind: ContentKind, value: serde_json::Value) -> Result<String, ContentError> {
        use crate::schema::ContentRecord;

        fn parse<T: serde::de::DeserializeOwned>(
            kind: ContentKind,
            value: serde_json::Value,
        ) -> Result<T, ContentError> {
            serde_json::from_value(value).map_err(|source| ContentError::Json { kind, source })
        }

        let key = match kind {
            ContentKind::Encounter => {
                let record: Encounter = parse(kind, value)?;
                let key = record.key().to_string();
                self.encounters.push(record);
                key
            }
            ContentKind::Location => {
                let record: Location = parse(kind, value)?;
                let key = record.key().to_string();
                self.locations.push(record);
                key
            }
            ContentKind::Npc => {
                let record: NpcTemplate = parse(kind, value)?;
                let key = record.key().to_string();
                self.npcs.push(record);
                key
            }
            ContentKind::SkillCheck => {
                let record: SkillCheck = parse(kind, value)?;
                let key = record.key().to_string();
                self.skill_checks.push(record);
                key
            }
            ContentKind::Danger => {
                let record: Danger = parse(kind, value)?;
                let key = record.key().to_string();
                self.dangers.push(record);
                key
            }
        };
        Ok(key)
    }

    /// Build a library from one JSON string per table.
    pub fn from_json(tables: &[(ContentKind, &str)]) -> Result<ContentLibrary, ContentError> {
        let mut library = ContentLibrary::default();
        for (kind, json) in tables {
            library.load_table(*kind, json)?;
        }
        Ok(library)
    }

    /// Serialize one table as pretty JSON, in the on-disk format.
    pub fn table_to_json(&self, kind: ContentKind) -> Result<String, ContentError> {
        let wrap = |source: serde_json::Error| ContentError::Json { kind, source };
        match kind {
            ContentKind::Encounter => serde_json::to_string_pretty(&self.encounters),
            ContentKind::Location => serde_json::to_string_pretty(&self.locations),
            ContentKind::Npc => serde_json::to_string_pretty(&self.npcs),
            ContentKind::SkillCheck => serde_json::to_string_pretty(&self.skill_checks),
            ContentKind::Danger => serde_json::to_string_pretty(&self.dangers),
        }
        .map_err(wrap)
    }

    pub fn count(&self, kind: ContentKind) -> usize {
        match kind {
            ContentKind::Encounter => self.encounters.len(),
            ContentKind::Location => self.locations.len(),
            ContentKind::Npc => self.npcs.len(),
            ContentKind::SkillCheck => self.skill_checks.len(),
            ContentKind::Danger => self.dangers.len(),
        }
    }

    /// Normalized keys of every record in a table, for duplicate checks.
    pub fn keys(&self, kind: ContentKind) -> Vec<String> {
        use crate::schema::ContentRecord;

        match kind {
            ContentKind::Encounter => self.encounters.iter().map(|r| r.normalized_key()).collect(),
            ContentKind::Location => self.locations.iter().map(|r| r.normalized_key()).collect(),
            ContentKind::Npc => self.npcs.iter().map(|r| r.normalized_key()).collect(),
            ContentKind::SkillCheck => self.skill_checks.iter().map(|r| r.normalized_key()).collect(),
            ContentKind::Danger => self.dangers.iter().map(|r| r.normalized_key()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        ContentKind::ALL.iter().all(|k| self.count(*k) == 0)
    }
}
