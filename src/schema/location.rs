use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::environment::Environment;
use super::{default_weight, ContentRecord};

/// A location template. Generation picks one detail from each tier:
/// the primary detail is what the party notices first, tertiary details
/// reward a closer look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub environments: Vec<Environment>,
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub tertiary: Vec<String>,
    #[serde(default = "default_weight")]
    #[schemars(range(min = 1, max = 1000))]
    pub weight: u32,
}

impl Location {
    /// The three detail tiers, labelled, in display order.
    pub fn detail_tiers(&self) -> [(&'static str, &[String]); 3] {
        [
            ("primary", self.primary.as_slice()),
            ("secondary", self.secondary.as_slice()),
            ("tertiary", self.tertiary.as_slice()),
        ]
    }
}

impl ContentRecord for Location {
    fn key(&self) -> &str {
        &self.name
    }

    fn key_field(&self) -> &'static str {
        "name"
    }

    fn environments(&self) -> &[Environment] {
        &self.environments
    }

    fn weight(&self) -> u32 {
        self.weight
    }
}

/// A location with one detail drawn from each tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLocation {
    pub name: String,
    pub primary: String,
    pub secondary: String,
    pub tertiary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_tiers_in_order() {
        let loc = Location {
            name: "Ruined Watchtower".to_string(),
            environments: vec![Environment::Plains],
            primary: vec!["a toppled spire".to_string()],
            secondary: vec!["crows".to_string()],
            tertiary: vec!["a hidden cellar".to_string()],
            weight: 1,
        };
        let tiers = loc.detail_tiers();
        assert_eq!(tiers[0].0, "primary");
        assert_eq!(tiers[2].1, &["a hidden cellar".to_string()]);
    }
}
