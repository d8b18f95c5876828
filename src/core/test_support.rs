//! Shared fixtures for unit tests.

use crate::core::content::{ContentKind, ContentLibrary};
use crate::core::generator::{EncounterGenerator, GenerationRequest, GeneratedEncounter};

/// A small library covering every table.
pub(crate) fn test_library() -> ContentLibrary {
    let encounters = r#"[
        {
            "title": "Bandit Toll",
            "descriptions": [
                "{npc} demands coin before anyone may pass {location}.",
                "Bandits led by {npc.name} block the road through {environment}."
            ],
            "resolutions": ["Pay the toll", "Fight through", "Talk them down"],
            "environments": ["forest", "plains"],
            "tags": ["social", "combat"]
        },
        {
            "title": "Frozen Shrine",
            "descriptions": ["An icy shrine glitters in {environment}. Beware {danger}."],
            "resolutions": ["Pray", "Loot the offerings"],
            "environments": ["arctic"],
            "tags": ["mystery"]
        },
        {
            "title": "Lost Child",
            "descriptions": ["A child sobs near {location}."],
            "resolutions": ["Escort them home", "Ask for a reward"],
            "tags": ["social"]
        }
    ]"#;
    let locations = r#"[
        {
            "name": "Old Mill",
            "environments": ["forest", "plains"],
            "primary": ["a creaking waterwheel", "collapsed grain sacks"],
            "secondary": ["rats scurry underfoot"],
            "tertiary": ["a trapdoor under the millstone"]
        }
    ]"#;
    let npcs = r#"[
        {
            "archetype": "Highwayman",
            "names": ["Vex", "Brannoc", "Ilsa"],
            "appearances": ["scarred cheek"],
            "personalities": ["greedy"],
            "motivations": ["pay off a debt"]
        }
    ]"#;
    let checks = r#"[
        {"skill": "Persuasion", "description": "Talk the bandits down", "dc": 13, "tags": ["social"]},
        {"skill": "Survival", "description": "Find shelter from the cold", "dc": 15, "environments": ["arctic"]},
        {"skill": "Perception", "description": "Spot the ambush", "dc": 12}
    ]"#;
    let dangers = r#"[
        {"title": "Thin Ice", "description": "The ice cracks.", "severity": "severe", "environments": ["arctic"]}
    ]"#;
    ContentLibrary::from_json(&[
        (ContentKind::Encounter, encounters),
        (ContentKind::Location, locations),
        (ContentKind::Npc, npcs),
        (ContentKind::SkillCheck, checks),
        (ContentKind::Danger, dangers),
    ])
    .unwrap()
}

/// A generator over [`test_library`] with a fixed seed.
pub(crate) fn test_generator(seed: u64) -> EncounterGenerator {
    EncounterGenerator::builder()
        .seed(seed)
        .with_library(test_library())
        .build()
        .unwrap()
}

pub(crate) fn sample_encounter() -> GeneratedEncounter {
    test_generator(42)
        .generate(&GenerationRequest::new(Some(crate::schema::environment::Environment::Forest)))
        .unwrap()
}
