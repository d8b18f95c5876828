use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::environment::Environment;
use super::{default_weight, ContentRecord};

/// A scripted situation: a title, several description variants and the
/// ways the party might resolve it.
///
/// Description variants are templates and may reference slots such as
/// `{npc}` or `{location}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Encounter {
    pub title: String,
    pub descriptions: Vec<String>,
    pub resolutions: Vec<String>,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_weight")]
    #[schemars(range(min = 1, max = 1000))]
    pub weight: u32,
}

impl Encounter {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl ContentRecord for Encounter {
    fn key(&self) -> &str {
        &self.title
    }

    fn environments(&self) -> &[Environment] {
        &self.environments
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}
