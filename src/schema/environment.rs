use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The terrain an encounter, location, NPC or danger belongs to.
///
/// Content records carry a list of environments; an empty list means the
/// record fits anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Arctic,
    Coastal,
    Desert,
    Dungeon,
    Forest,
    Mountain,
    Plains,
    Swamp,
    Underdark,
    Urban,
}

impl Environment {
    pub const ALL: [Environment; 10] = [
        Self::Arctic,
        Self::Coastal,
        Self::Desert,
        Self::Dungeon,
        Self::Forest,
        Self::Mountain,
        Self::Plains,
        Self::Swamp,
        Self::Underdark,
        Self::Urban,
    ];

    /// Lowercase identifier as used in the JSON tables.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arctic => "arctic",
            Self::Coastal => "coastal",
            Self::Desert => "desert",
            Self::Dungeon => "dungeon",
            Self::Forest => "forest",
            Self::Mountain => "mountain",
            Self::Plains => "plains",
            Self::Swamp => "swamp",
            Self::Underdark => "underdark",
            Self::Urban => "urban",
        }
    }

    /// Short phrase used when the environment is interpolated into prose.
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Arctic => "the frozen wastes",
            Self::Coastal => "the windswept coast",
            Self::Desert => "the open desert",
            Self::Dungeon => "the dungeon depths",
            Self::Forest => "the deep woods",
            Self::Mountain => "the high passes",
            Self::Plains => "the rolling plains",
            Self::Swamp => "the fetid marsh",
            Self::Underdark => "the lightless Underdark",
            Self::Urban => "the crowded streets",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown environment '{0}'")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|env| env.name() == lowered)
            .ok_or(UnknownEnvironment(s.to_string()))
    }
}

/// Returns true when a record restricted to `allowed` may appear in `requested`.
///
/// An empty `allowed` list matches every environment, and a missing request
/// matches every record.
pub fn environment_matches(allowed: &[Environment], requested: Option<Environment>) -> bool {
    match requested {
        None => true,
        Some(env) => allowed.is_empty() || allowed.contains(&env),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Forest".parse::<Environment>().unwrap(), Environment::Forest);
        assert_eq!(" urban ".parse::<Environment>().unwrap(), Environment::Urban);
        assert!("moon".parse::<Environment>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Environment::Underdark).unwrap();
        assert_eq!(json, "\"underdark\"");
        let env: Environment = serde_json::from_str("\"swamp\"").unwrap();
        assert_eq!(env, Environment::Swamp);
    }

    #[test]
    fn empty_allow_list_matches_everything() {
        assert!(environment_matches(&[], Some(Environment::Desert)));
        assert!(environment_matches(&[Environment::Forest], None));
        assert!(environment_matches(
            &[Environment::Forest, Environment::Swamp],
            Some(Environment::Swamp)
        ));
        assert!(!environment_matches(
            &[Environment::Forest],
            Some(Environment::Desert)
        ));
    }
}
