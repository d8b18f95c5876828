use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::environment::Environment;
use super::ContentRecord;

/// Lowest and highest difficulty class accepted in content.
pub const DC_RANGE: std::ops::RangeInclusive<u8> = 5..=30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SkillCheck {
    pub skill: String,
    pub description: String,
    #[schemars(range(min = 5, max = 30))]
    pub dc: u8,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SkillCheck {
    /// Rough difficulty label for a DC, following the usual d20 ladder.
    pub fn difficulty(&self) -> &'static str {
        match self.dc {
            0..=5 => "very easy",
            6..=10 => "easy",
            11..=15 => "medium",
            16..=20 => "hard",
            21..=25 => "very hard",
            _ => "nearly impossible",
        }
    }

    pub fn summary(&self) -> String {
        format!("{} (DC {}): {}", self.skill, self.dc, self.description)
    }
}

impl ContentRecord for SkillCheck {
    fn key(&self) -> &str {
        &self.description
    }

    fn key_field(&self) -> &'static str {
        "description"
    }

    fn environments(&self) -> &[Environment] {
        &self.environments
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}
