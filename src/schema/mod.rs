//! Content record types for the static JSON tables.

pub mod danger;
pub mod encounter;
pub mod environment;
pub mod location;
pub mod npc;
pub mod skill_check;

use environment::Environment;

/// Behaviour shared by every record stored in a content table.
pub trait ContentRecord {
    /// Human-facing identity of the record (title or name).
    fn key(&self) -> &str;

    /// Name of the field `key` reads from, for messages.
    fn key_field(&self) -> &'static str {
        "title"
    }

    /// Environments the record is restricted to. Empty means anywhere.
    fn environments(&self) -> &[Environment];

    /// Relative selection weight.
    fn weight(&self) -> u32 {
        1
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    /// Key normalized for duplicate detection.
    fn normalized_key(&self) -> String {
        normalize_key(self.key())
    }
}

/// Lowercase, strip punctuation and collapse whitespace so that
/// "The Bandit  Toll!" and "the bandit toll" compare equal.
pub fn normalize_key(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper bound on record weights accepted from content files.
pub const MAX_WEIGHT: u32 = 1000;

pub(crate) fn default_weight() -> u32 {
    1
}
