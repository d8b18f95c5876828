use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::environment::Environment;
use super::{default_weight, ContentRecord};

/// An NPC archetype with pools to draw a concrete character from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NpcTemplate {
    pub archetype: String,
    #[serde(default)]
    pub environments: Vec<Environment>,
    pub names: Vec<String>,
    pub appearances: Vec<String>,
    pub personalities: Vec<String>,
    pub motivations: Vec<String>,
    #[serde(default = "default_weight")]
    #[schemars(range(min = 1, max = 1000))]
    pub weight: u32,
}

impl NpcTemplate {
    pub fn pools(&self) -> [(&'static str, &[String]); 4] {
        [
            ("names", self.names.as_slice()),
            ("appearances", self.appearances.as_slice()),
            ("personalities", self.personalities.as_slice()),
            ("motivations", self.motivations.as_slice()),
        ]
    }
}

impl ContentRecord for NpcTemplate {
    fn key(&self) -> &str {
        &self.archetype
    }

    fn key_field(&self) -> &'static str {
        "archetype"
    }

    fn environments(&self) -> &[Environment] {
        &self.environments
    }

    fn weight(&self) -> u32 {
        self.weight
    }
}

/// A concrete NPC rolled from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub archetype: String,
    pub appearance: String,
    pub personality: String,
    pub motivation: String,
}

impl Npc {
    /// "Name, the archetype", used when an NPC is mentioned in prose.
    pub fn introduction(&self) -> String {
        format!("{}, the {}", self.name, self.archetype.to_lowercase())
    }
}
