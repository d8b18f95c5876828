use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::environment::Environment;
use super::{default_weight, ContentRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Deadly,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Deadly => "deadly",
        };
        f.write_str(label)
    }
}

/// An environmental or situational hazard that can complicate an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Danger {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default = "default_weight")]
    #[schemars(range(min = 1, max = 1000))]
    pub weight: u32,
}

impl ContentRecord for Danger {
    fn key(&self) -> &str {
        &self.title
    }

    fn environments(&self) -> &[Environment] {
        &self.environments
    }

    fn weight(&self) -> u32 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_threat() {
        assert!(Severity::Minor < Severity::Deadly);
        assert_eq!(Severity::Severe.to_string(), "severe");
    }

    #[test]
    fn deserialize_danger() {
        let json = r#"{
            "title": "Quicksand",
            "description": "The ground gives way.",
            "severity": "severe",
            "environments": ["desert", "swamp"]
        }"#;
        let danger: Danger = serde_json::from_str(json).unwrap();
        assert_eq!(danger.severity, Severity::Severe);
        assert_eq!(danger.environments.len(), 2);
        assert_eq!(danger.weight, 1);
    }
}
