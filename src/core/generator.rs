/// The encounter generator: filtered weighted selection → composed scene.
///
/// Wires together the content library, selection filters, the recent-title
/// window and description templating.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::core::content::ContentLibrary;
use crate::core::context::RecentWindow;
use crate::core::selection::{filter_records, pick_one, pick_record, TagFilter};
use crate::core::template::{SlotValues, Template, TemplateError};
use crate::schema::danger::Danger;
use crate::schema::encounter::Encounter;
use crate::schema::environment::{environment_matches, Environment};
use crate::schema::location::GeneratedLocation;
use crate::schema::npc::Npc;
use crate::schema::skill_check::SkillCheck;

/// Most skill checks attached to a single encounter.
const MAX_SKILL_CHECKS: usize = 2;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("template error in '{title}': {source}")]
    Template {
        title: String,
        #[source]
        source: TemplateError,
    },
    #[error("no encounter matches environment {environment} with filters [{filters}]")]
    NoMatchingEncounter { environment: String, filters: String },
    #[error("encounter '{0}' has no description variants")]
    NoDescriptions(String),
    #[error("danger chance must be within 0.0..=1.0, got {0}")]
    InvalidDangerChance(f64),
}

/// What the user asked for: an environment and tag filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub environment: Option<Environment>,
    #[serde(default)]
    pub filter: TagFilter,
}

impl GenerationRequest {
    pub fn new(environment: Option<Environment>) -> Self {
        Self {
            environment,
            filter: TagFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: TagFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// A fully composed encounter, ready to display, save or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEncounter {
    pub title: String,
    pub description: String,
    /// The description variant before slot substitution; kept so rerolls
    /// can re-render the prose.
    #[serde(default)]
    pub template: String,
    pub resolutions: Vec<String>,
    pub environment: Option<Environment>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Option<GeneratedLocation>,
    #[serde(default)]
    pub npcs: Vec<Npc>,
    #[serde(default)]
    pub skill_checks: Vec<SkillCheck>,
    pub danger: Option<Danger>,
    pub seed: u64,
}

impl GeneratedEncounter {
    /// Recompute `description` from `template` and the current parts.
    pub fn rerender(&mut self) -> Result<(), GenerateError> {
        let values = slot_values(self);
        self.description = Template::parse(&self.template)
            .and_then(|t| t.render(&values))
            .map_err(|source| GenerateError::Template {
                title: self.title.clone(),
                source,
            })?;
        Ok(())
    }
}

/// The top-level generator. Built via `EncounterGenerator::builder()`.
pub struct EncounterGenerator {
    library: ContentLibrary,
    seed: u64,
    generation_count: u64,
    npc_count: usize,
    danger_chance: f64,
    recent: RecentWindow,
}

/// Builder for constructing an `EncounterGenerator`.
pub struct EncounterGeneratorBuilder {
    data_dir: Option<PathBuf>,
    seed: u64,
    npc_count: usize,
    danger_chance: f64,
    recent_window: usize,
    /// Directly provided content (for embedding and tests).
    library: Option<ContentLibrary>,
}

impl EncounterGenerator {
    pub fn builder() -> EncounterGeneratorBuilder {
        EncounterGeneratorBuilder {
            data_dir: None,
            seed: 0,
            npc_count: 2,
            danger_chance: 0.5,
            recent_window: 5,
            library: None,
        }
    }

    pub fn library(&self) -> &ContentLibrary {
        &self.library
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseed and forget generation history.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.generation_count = 0;
        self.recent.clear();
    }

    fn next_rng(&mut self) -> (StdRng, u64) {
        let seed = self.seed.wrapping_add(self.generation_count);
        self.generation_count += 1;
        (StdRng::seed_from_u64(seed), seed)
    }

    /// Generate a complete encounter for the request.
    pub fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<GeneratedEncounter, GenerateError> {
        let (mut rng, seed) = self.next_rng();

        // 1. Filter by environment and tags
        let candidates = filter_records(
            &self.library.encounters,
            request.environment,
            &request.filter,
        );
        if candidates.is_empty() {
            return Err(GenerateError::NoMatchingEncounter {
                environment: request
                    .environment
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "any".to_string()),
                filters: request.filter.describe(),
            });
        }

        // 2. Weighted pick, avoiding recent titles
        let candidates = self.recent.prefer_fresh(candidates, |e| e.title.as_str());
        let encounter: Encounter = pick_record(&candidates, &mut rng)
            .or_else(|| candidates.first().copied())
            .cloned()
            .ok_or_else(|| GenerateError::NoMatchingEncounter {
                environment: "any".to_string(),
                filters: request.filter.describe(),
            })?;
        tracing::debug!(
            "Selected encounter '{}' from {} candidates (seed {})",
            encounter.title,
            candidates.len(),
            seed
        );

        // 3-6. Compose the scene
        let env = request.environment;
        let location = roll_location(&self.library, env, &mut rng);
        let npcs = roll_npcs(&self.library, env, self.npc_count, &mut rng);
        let skill_checks = pick_skill_checks(&self.library, env, &encounter.tags, &mut rng);
        let danger = if rng.gen_bool(self.danger_chance) {
            roll_danger(&self.library, env, &mut rng)
        } else {
            None
        };

        // 7. Description variant
        let template = encounter
            .descriptions
            .choose(&mut rng)
            .cloned()
            .ok_or_else(|| GenerateError::NoDescriptions(encounter.title.clone()))?;

        let mut generated = GeneratedEncounter {
            title: encounter.title.clone(),
            description: String::new(),
            template,
            resolutions: encounter.resolutions.clone(),
            environment: env,
            tags: encounter.tags.clone(),
            location,
            npcs,
            skill_checks,
            danger,
            seed,
        };
        generated.rerender()?;

        self.recent.record(&generated.title);
        Ok(generated)
    }

    /// Generate several independent encounters for the same request.
    pub fn generate_variants(
        &mut self,
        request: &GenerationRequest,
        count: usize,
    ) -> Result<Vec<GeneratedEncounter>, GenerateError> {
        (0..count).map(|_| self.generate(request)).collect()
    }

    pub fn generate_location(&mut self, environment: Option<Environment>) -> Option<GeneratedLocation> {
        let (mut rng, _) = self.next_rng();
        roll_location(&self.library, environment, &mut rng)
    }

    pub fn generate_npc(&mut self, environment: Option<Environment>) -> Option<Npc> {
        let (mut rng, _) = self.next_rng();
        roll_npc(&self.library, environment, &mut rng)
    }

    /// Replace the location of an existing encounter and re-render its prose.
    pub fn reroll_location(
        &mut self,
        current: &GeneratedEncounter,
    ) -> Result<GeneratedEncounter, GenerateError> {
        let (mut rng, _) = self.next_rng();
        let mut next = current.clone();
        next.location = roll_location(&self.library, current.environment, &mut rng);
        next.rerender()?;
        Ok(next)
    }

    /// Replace the NPCs of an existing encounter and re-render its prose.
    pub fn reroll_npcs(
        &mut self,
        current: &GeneratedEncounter,
    ) -> Result<GeneratedEncounter, GenerateError> {
        let (mut rng, _) = self.next_rng();
        let mut next = current.clone();
        next.npcs = roll_npcs(&self.library, current.environment, current.npcs.len(), &mut rng);
        next.rerender()?;
        Ok(next)
    }
}

impl EncounterGeneratorBuilder {
    /// Load content tables from a data directory at build time.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn npc_count(mut self, count: usize) -> Self {
        self.npc_count = count;
        self
    }

    /// Probability that an encounter comes with a danger.
    pub fn danger_chance(mut self, chance: f64) -> Self {
        self.danger_chance = chance;
        self
    }

    pub fn recent_window(mut self, size: usize) -> Self {
        self.recent_window = size;
        self
    }

    /// Provide content directly (takes precedence over `data_dir`).
    pub fn with_library(mut self, library: ContentLibrary) -> Self {
        self.library = Some(library);
        self
    }

    pub fn build(self) -> Result<EncounterGenerator, GenerateError> {
        if !(0.0..=1.0).contains(&self.danger_chance) {
            return Err(GenerateError::InvalidDangerChance(self.danger_chance));
        }

        let library = match (self.library, self.data_dir) {
            (Some(library), _) => library,
            (None, Some(dir)) => {
                let (library, report) = ContentLibrary::load_dir(&dir);
                if !report.is_complete() {
                    tracing::warn!(
                        "{} content tables failed to load from {}",
                        report.failed.len(),
                        dir.display()
                    );
                }
                library
            }
            (None, None) => ContentLibrary::default(),
        };

        Ok(EncounterGenerator {
            library,
            seed: self.seed,
            generation_count: 0,
            npc_count: self.npc_count,
            danger_chance: self.danger_chance,
            recent: RecentWindow::new(self.recent_window),
        })
    }
}

fn roll_location<R: Rng>(
    library: &ContentLibrary,
    environment: Option<Environment>,
    rng: &mut R,
) -> Option<GeneratedLocation> {
    let candidates = filter_records(&library.locations, environment, &TagFilter::default());
    let location = pick_record(&candidates, rng)?;
    Some(GeneratedLocation {
        name: location.name.clone(),
        primary: pick_one(&location.primary, rng)?.to_string(),
        secondary: pick_one(&location.secondary, rng)?.to_string(),
        tertiary: pick_one(&location.tertiary, rng)?.to_string(),
    })
}

fn roll_npc<R: Rng>(
    library: &ContentLibrary,
    environment: Option<Environment>,
    rng: &mut R,
) -> Option<Npc> {
    let candidates = filter_records(&library.npcs, environment, &TagFilter::default());
    let template = pick_record(&candidates, rng)?;
    Some(Npc {
        name: pick_one(&template.names, rng)?.to_string(),
        archetype: template.archetype.clone(),
        appearance: pick_one(&template.appearances, rng)?.to_string(),
        personality: pick_one(&template.personalities, rng)?.to_string(),
        motivation: pick_one(&template.motivations, rng)?.to_string(),
    })
}

fn roll_npcs<R: Rng>(
    library: &ContentLibrary,
    environment: Option<Environment>,
    count: usize,
    rng: &mut R,
) -> Vec<Npc> {
    let mut npcs: Vec<Npc> = Vec::with_capacity(count);
    // A few extra attempts so duplicate names can be rerolled
    for _ in 0..count * 3 {
        if npcs.len() == count {
            break;
        }
        match roll_npc(library, environment, rng) {
            Some(npc) if npcs.iter().any(|n| n.name == npc.name) => continue,
            Some(npc) => npcs.push(npc),
            None => break,
        }
    }
    npcs
}

/// Up to two checks for the environment, preferring ones that share a tag
/// with the encounter.
fn pick_skill_checks<R: Rng>(
    library: &ContentLibrary,
    environment: Option<Environment>,
    encounter_tags: &[String],
    rng: &mut R,
) -> Vec<SkillCheck> {
    let (mut preferred, mut others): (Vec<&SkillCheck>, Vec<&SkillCheck>) = library
        .skill_checks
        .iter()
        .filter(|c| environment_matches(&c.environments, environment))
        .partition(|c| c.tags.iter().any(|t| encounter_tags.contains(t)));

    preferred.shuffle(rng);
    others.shuffle(rng);
    preferred
        .into_iter()
        .chain(others)
        .take(MAX_SKILL_CHECKS)
        .cloned()
        .collect()
}

fn roll_danger<R: Rng>(
    library: &ContentLibrary,
    environment: Option<Environment>,
    rng: &mut R,
) -> Option<Danger> {
    let candidates = filter_records(&library.dangers, environment, &TagFilter::default());
    pick_record(&candidates, rng).cloned()
}

/// Slot values for an encounter's parts, with fallbacks for missing parts.
fn slot_values(encounter: &GeneratedEncounter) -> SlotValues {
    let mut values = SlotValues::new();
    match encounter.npcs.first() {
        Some(npc) => {
            values
                .set("npc", npc.introduction())
                .set("npc.name", npc.name.as_str())
                .set("npc.archetype", npc.archetype.to_lowercase());
        }
        None => {
            values
                .set("npc", "a stranger")
                .set("npc.name", "a stranger")
                .set("npc.archetype", "stranger");
        }
    }
    values.set(
        "location",
        encounter
            .location
            .as_ref()
            .map(|l| format!("the {}", l.name.to_lowercase()))
            .unwrap_or_else(|| "the area".to_string()),
    );
    values.set(
        "danger",
        encounter
            .danger
            .as_ref()
            .map(|d| d.title.to_lowercase())
            .unwrap_or_else(|| "an unseen threat".to_string()),
    );
    values.set(
        "skill",
        encounter
            .skill_checks
            .first()
            .map(|c| c.skill.to_lowercase())
            .unwrap_or_else(|| "quick thinking".to_string()),
    );
    values.set(
        "environment",
        encounter.environment.map(|e| e.phrase()).unwrap_or("the wilds"),
    );
    values
}
