/// Runtime configuration, read from a RON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::generator::{EncounterGenerator, EncounterGeneratorBuilder};
use crate::core::history::DEFAULT_HISTORY_LIMIT;
use crate::schema::environment::Environment;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "loreweaver.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("danger_chance must be within 0.0..=1.0, got {0}")]
    DangerChance(f64),
}

/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoreweaverConfig {
    pub data_dir: PathBuf,
    pub storage_path: PathBuf,
    pub history_limit: usize,
    pub npc_count: usize,
    pub danger_chance: f64,
    pub recent_window: usize,
    pub default_environment: Option<Environment>,
    /// Fixed seed; when absent each run is seeded randomly.
    pub seed: Option<u64>,
}

impl Default for LoreweaverConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            storage_path: PathBuf::from(".loreweaver/store.json"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            npc_count: 2,
            danger_chance: 0.5,
            recent_window: 5,
            default_environment: None,
            seed: None,
        }
    }
}

impl LoreweaverConfig {
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        if !(0.0..=1.0).contains(&config.danger_chance) {
            return Err(ConfigError::DangerChance(config.danger_chance));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&contents)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else `loreweaver.ron` in the working directory
    /// if it exists, else defaults. An explicit path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    tracing::debug!("No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// A generator builder carrying these settings and loading from
    /// `data_dir`.
    pub fn generator_builder(&self) -> EncounterGeneratorBuilder {
        EncounterGenerator::builder()
            .data_dir(self.data_dir.clone())
            .seed(self.effective_seed())
            .npc_count(self.npc_count)
            .danger_chance(self.danger_chance)
            .recent_window(self.recent_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = LoreweaverConfig::from_ron("()").unwrap();
        assert_eq!(config, LoreweaverConfig::default());
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn partial_config() {
        let config = LoreweaverConfig::from_ron(
            r#"(
                data_dir: "content",
                npc_count: 3,
                default_environment: Some(swamp),
                seed: Some(99),
            )"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("content"));
        assert_eq!(config.npc_count, 3);
        assert_eq!(config.default_environment, Some(Environment::Swamp));
        assert_eq!(config.effective_seed(), 99);
        assert_eq!(config.recent_window, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            LoreweaverConfig::from_ron("(danger_chance: 1.5)"),
            Err(ConfigError::DangerChance(_))
        ));
        assert!(matches!(
            LoreweaverConfig::from_ron("(colour: \"red\")"),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn explicit_missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(matches!(
            LoreweaverConfig::load_or_default(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn example_config_parses() {
        let config =
            LoreweaverConfig::from_ron(include_str!("../../loreweaver.example.ron")).unwrap();
        assert_eq!(config.default_environment, Some(Environment::Forest));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loreweaver.ron");
        std::fs::write(&path, "(history_limit: 5)").unwrap();
        assert_eq!(LoreweaverConfig::load(&path).unwrap().history_limit, 5);
    }
}
