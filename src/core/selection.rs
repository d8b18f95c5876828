/// Weighted random selection and record filtering.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::schema::environment::{environment_matches, Environment};
use crate::schema::ContentRecord;

/// Include/exclude tag filter applied to records that carry tags.
///
/// A record passes when it has every `include` tag and no `exclude` tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    #[serde(default)]
    pub include: FxHashSet<String>,
    #[serde(default)]
    pub exclude: FxHashSet<String>,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, tag: &str) -> Self {
        self.exclude.remove(tag);
        self.include.insert(tag.to_string());
        self
    }

    pub fn exclude(mut self, tag: &str) -> Self {
        self.include.remove(tag);
        self.exclude.insert(tag.to_string());
        self
    }

    /// Drop a tag from both sets.
    pub fn without(mut self, tag: &str) -> Self {
        self.include.remove(tag);
        self.exclude.remove(tag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn matches(&self, tags: &[String]) -> bool {
        self.include.iter().all(|t| tags.contains(t))
            && !tags.iter().any(|t| self.exclude.contains(t))
    }

    /// Sorted, comma-separated rendering for display and logs.
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self.include.iter().map(|t| format!("+{}", t)).collect();
        parts.extend(self.exclude.iter().map(|t| format!("-{}", t)));
        parts.sort();
        parts.join(", ")
    }
}

/// Records that fit the requested environment and tag filter.
pub fn filter_records<'a, T: ContentRecord>(
    records: &'a [T],
    environment: Option<Environment>,
    filter: &TagFilter,
) -> Vec<&'a T> {
    records
        .iter()
        .filter(|r| environment_matches(r.environments(), environment))
        .filter(|r| filter.matches(r.tags()))
        .collect()
}

/// Pick one item with probability proportional to `weight`.
///
/// Returns `None` when there are no candidates or every weight is zero.
pub fn pick_weighted<'a, T, R, F>(items: &[&'a T], weight: F, rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> u32,
{
    if items.is_empty() {
        return None;
    }
    // Summed as u64 so large weights cannot overflow the total
    let weights: Vec<u64> = items.iter().map(|item| u64::from(weight(item))).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(items[dist.sample(rng)])
}

/// Weighted pick over content records using their own weights.
pub fn pick_record<'a, T: ContentRecord, R: Rng + ?Sized>(
    items: &[&'a T],
    rng: &mut R,
) -> Option<&'a T> {
    pick_weighted(items, |r| r.weight(), rng)
}

/// Uniform pick from a string pool.
pub fn pick_one<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> Option<&'a str> {
    pool.choose(rng).map(String::as_str)
}
