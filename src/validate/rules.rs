/// Validation rules for submitted content entries.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;

use super::{Severity, Submission, ValidationReport};
use crate::core::content::{ContentKind, ContentLibrary};
use crate::core::template::{Template, KNOWN_SLOTS};
use crate::schema::danger::Danger;
use crate::schema::encounter::Encounter;
use crate::schema::environment::Environment;
use crate::schema::location::Location;
use crate::schema::npc::NpcTemplate;
use crate::schema::normalize_key;
use crate::schema::skill_check::{SkillCheck, DC_RANGE};
use crate::schema::{ContentRecord, MAX_WEIGHT};

/// Titles longer than this draw a warning; they wrap badly on cards.
pub const MAX_TITLE_CHARS: usize = 60;

/// Option pools smaller than this draw a warning.
pub const RECOMMENDED_OPTIONS: usize = 3;

/// Validate every entry of a submission.
///
/// Each entry is parsed into its typed record first; an entry that does not
/// parse gets one error and is skipped by the remaining rules. With a
/// production library, entries whose normalized key already exists there
/// are rejected as duplicates.
pub fn validate_submission(
    submission: &Submission,
    production: Option<&ContentLibrary>,
) -> ValidationReport {
    let kind = submission.kind;
    let mut report = ValidationReport::new(kind, submission.entries.len());
    if submission.entries.is_empty() {
        report.push(Severity::Warning, None, None, "submission has no entries");
    }

    let production_keys: FxHashSet<String> = production
        .map(|library| library.keys(kind).into_iter().collect())
        .unwrap_or_default();
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();

    for (index, value) in submission.entries.iter().enumerate() {
        let Some(key) = check_entry(kind, index, value, &mut report) else {
            continue;
        };
        let normalized = normalize_key(&key);
        if let Some(first) = seen.get(&normalized) {
            report.push(
                Severity::Error,
                Some(index),
                Some(&key),
                format!("duplicates entry {} in this submission", first),
            );
        } else {
            seen.insert(normalized.clone(), index);
        }
        if production_keys.contains(&normalized) {
            report.push(
                Severity::Error,
                Some(index),
                Some(&key),
                format!("already exists in the production {} table", kind),
            );
        }
    }

    tracing::debug!(
        "Validated {} {} entries: {} errors, {} warnings",
        submission.entries.len(),
        kind,
        report.error_count(),
        report.warning_count()
    );
    report
}

/// Run the typed rules for one entry. Returns the entry's key when it
/// parsed and has one.
fn check_entry(
    kind: ContentKind,
    index: usize,
    value: &serde_json::Value,
    report: &mut ValidationReport,
) -> Option<String> {
    match kind {
        ContentKind::Encounter => {
            let record: Encounter = parse(kind, index, value, report)?;
            let mut check = EntryCheck::new(report, index, &record);
            check_encounter(&mut check, &record);
            check.finish()
        }
        ContentKind::Location => {
            let record: Location = parse(kind, index, value, report)?;
            let mut check = EntryCheck::new(report, index, &record);
            for (tier, details) in record.detail_tiers() {
                check.pool(tier, details, 1, RECOMMENDED_OPTIONS);
            }
            check.finish()
        }
        ContentKind::Npc => {
            let record: NpcTemplate = parse(kind, index, value, report)?;
            let mut check = EntryCheck::new(report, index, &record);
            for (pool, options) in record.pools() {
                check.pool(pool, options, 1, RECOMMENDED_OPTIONS);
            }
            check.finish()
        }
        ContentKind::SkillCheck => {
            let record: SkillCheck = parse(kind, index, value, report)?;
            let mut check = EntryCheck::new(report, index, &record);
            check.text("skill", &record.skill);
            if !DC_RANGE.contains(&record.dc) {
                check.error(format!(
                    "dc {} is outside {}..={}",
                    record.dc,
                    DC_RANGE.start(),
                    DC_RANGE.end()
                ));
            }
            check.finish()
        }
        ContentKind::Danger => {
            let record: Danger = parse(kind, index, value, report)?;
            let mut check = EntryCheck::new(report, index, &record);
            check.text("description", &record.description);
            check.finish()
        }
    }
}

fn parse<T: DeserializeOwned>(
    kind: ContentKind,
    index: usize,
    value: &serde_json::Value,
    report: &mut ValidationReport,
) -> Option<T> {
    match T::deserialize(value) {
        Ok(record) => Some(record),
        Err(e) => {
            let key = value
                .get("title")
                .or_else(|| value.get("name"))
                .or_else(|| value.get("archetype"))
                .and_then(|v| v.as_str());
            report.push(
                Severity::Error,
                Some(index),
                key,
                format!("not a valid {}: {}", kind, e),
            );
            None
        }
    }
}

fn check_encounter(check: &mut EntryCheck<'_>, encounter: &Encounter) {
    check.pool("descriptions", &encounter.descriptions, 1, 1);
    check.pool("resolutions", &encounter.resolutions, 2, RECOMMENDED_OPTIONS);

    for (n, description) in encounter.descriptions.iter().enumerate() {
        match Template::parse(description) {
            Ok(template) => {
                for slot in template.unknown_slots() {
                    check.error(format!(
                        "description {} uses unknown slot {{{}}} (known: {})",
                        n + 1,
                        slot,
                        KNOWN_SLOTS.join(", ")
                    ));
                }
            }
            Err(e) => check.error(format!("description {}: {}", n + 1, e)),
        }
    }

    for tag in &encounter.tags {
        if tag.trim().is_empty() {
            check.error("tags contain an empty tag");
        } else if tag != &tag.to_lowercase() {
            check.warning(format!("tag '{}' should be lowercase", tag));
        }
    }
}

/// Rule helpers bound to one entry of the report.
struct EntryCheck<'r> {
    report: &'r mut ValidationReport,
    index: usize,
    key: String,
}

impl<'r> EntryCheck<'r> {
    /// Starts with the checks every record shares: key, weight and
    /// environments.
    fn new<R: ContentRecord>(report: &'r mut ValidationReport, index: usize, record: &R) -> Self {
        let mut check = Self {
            report,
            index,
            key: record.key().trim().to_string(),
        };
        let field = record.key_field();
        if check.key.is_empty() {
            check.error(format!("{} is empty", field));
        } else if check.key.chars().count() > MAX_TITLE_CHARS {
            check.warning(format!(
                "{} is {} characters; keep it under {}",
                field,
                check.key.chars().count(),
                MAX_TITLE_CHARS
            ));
        }
        match record.weight() {
            0 => check.error("weight must be at least 1"),
            w if w > MAX_WEIGHT => {
                check.error(format!("weight {} is above the maximum of {}", w, MAX_WEIGHT))
            }
            _ => {}
        }
        check.environments(record.environments());
        check
    }

    fn push(&mut self, severity: Severity, message: String) {
        let key = (!self.key.is_empty()).then_some(self.key.as_str());
        self.report.push(severity, Some(self.index), key, message);
    }

    fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message.into());
    }

    fn text(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.error(format!("{} is empty", field));
        }
    }

    /// A list of options: at least `required` items, none blank, no
    /// duplicates. Fewer than `recommended` only warns.
    fn pool(&mut self, field: &str, items: &[String], required: usize, recommended: usize) {
        if items.len() < required {
            let noun = if required == 1 { "item" } else { "items" };
            self.error(format!(
                "{} needs at least {} {}, found {}",
                field,
                required,
                noun,
                items.len()
            ));
        } else if items.len() < recommended {
            self.warning(format!(
                "{} has only {} option(s); {} or more give better variety",
                field,
                items.len(),
                recommended
            ));
        }

        let mut seen = FxHashSet::default();
        for item in items {
            if item.trim().is_empty() {
                self.error(format!("{} contains an empty item", field));
            } else if !seen.insert(normalize_key(item)) {
                self.error(format!("{} contains duplicate item '{}'", field, item.trim()));
            }
        }
    }

    fn environments(&mut self, environments: &[Environment]) {
        let mut seen = FxHashSet::default();
        for env in environments {
            if !seen.insert(*env) {
                self.warning(format!("environment '{}' listed twice", env));
            }
        }
    }

    /// The key to use for duplicate detection, if the entry has one.
    fn finish(self) -> Option<String> {
        (!self.key.is_empty()).then_some(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::test_library;
    use serde_json::json;

    fn encounter(title: &str) -> serde_json::Value {
        json!({
            "title": title,
            "descriptions": ["{npc} waits at {location}."],
            "resolutions": ["Talk", "Fight", "Sneak past"],
            "environments": ["forest"],
            "tags": ["social"]
        })
    }

    fn messages(report: &ValidationReport) -> Vec<String> {
        report.issues.iter().map(|i| i.message.clone()).collect()
    }

    #[test]
    fn clean_encounter_passes() {
        let sub = Submission::new(ContentKind::Encounter, vec![encounter("Toll Bridge")]);
        let report = validate_submission(&sub, Some(&test_library()));
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn encounter_needs_two_resolutions() {
        let mut entry = encounter("One Way Out");
        entry["resolutions"] = json!(["Leave"]);
        let report = validate_submission(&Submission::new(ContentKind::Encounter, vec![entry]), None);
        assert_eq!(report.error_count(), 1);
        assert_eq!(messages(&report), vec!["resolutions needs at least 2 items, found 1"]);
    }

    #[test]
    fn two_resolutions_only_warn() {
        let mut entry = encounter("Fork");
        entry["resolutions"] = json!(["Left", "Right"]);
        let report = validate_submission(&Submission::new(ContentKind::Encounter, vec![entry]), None);
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn bad_templates_reported() {
        let mut entry = encounter("Broken");
        entry["descriptions"] = json!(["A {monster} appears.", "Unclosed {npc"]);
        let report = validate_submission(&Submission::new(ContentKind::Encounter, vec![entry]), None);
        let msgs = messages(&report);
        assert_eq!(report.error_count(), 2, "{:?}", msgs);
        assert!(msgs[0].starts_with("description 1 uses unknown slot {monster}"));
        assert!(msgs[1].starts_with("description 2:"));
    }

    #[test]
    fn malformed_entry_does_not_stop_others() {
        let sub = Submission::new(
            ContentKind::Encounter,
            vec![
                json!({"title": "Typo", "descriptons": ["x"], "resolutions": ["a", "b"]}),
                encounter("Fine"),
            ],
        );
        let report = validate_submission(&sub, None);
        assert_eq!(report.error_count(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.entry, Some(0));
        assert_eq!(issue.key.as_deref(), Some("Typo"));
        assert!(issue.message.starts_with("not a valid encounter"));
    }

    #[test]
    fn duplicates_within_submission_and_production() {
        let sub = Submission::new(
            ContentKind::Encounter,
            vec![
                encounter("Toll Bridge"),
                encounter("toll bridge!"),
                encounter("Bandit Toll"),
            ],
        );
        let report = validate_submission(&sub, Some(&test_library()));
        let msgs = messages(&report);
        assert_eq!(
            msgs,
            vec![
                "duplicates entry 0 in this submission".to_string(),
                "already exists in the production encounter table".to_string(),
            ]
        );
        assert_eq!(report.issues[1].entry, Some(2));

        // Without production data only the internal duplicate is caught
        assert_eq!(validate_submission(&sub, None).error_count(), 1);
    }

    #[test]
    fn location_tiers_must_be_unique() {
        let entry = json!({
            "name": "Watchtower",
            "primary": ["a broken ladder", "A broken ladder", "arrow slits"],
            "secondary": ["wind howls", "crows nest", "a cold hearth"],
            "tertiary": ["a hidden cache", "old graffiti", "a signal mirror"]
        });
        let report = validate_submission(&Submission::new(ContentKind::Location, vec![entry]), None);
        assert_eq!(
            messages(&report),
            vec!["primary contains duplicate item 'A broken ladder'"]
        );
    }

    #[test]
    fn npc_short_pools_warn() {
        let entry = json!({
            "archetype": "Hermit",
            "names": ["Old Tam"],
            "appearances": ["ragged cloak", "wild beard", "bare feet"],
            "personalities": ["suspicious", "kind", "rambling"],
            "motivations": ["be left alone", "find a successor", "warn travellers"]
        });
        let report = validate_submission(&Submission::new(ContentKind::Npc, vec![entry]), None);
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 1);
        assert!(report.issues[0].message.starts_with("names has only 1 option"));
    }

    #[test]
    fn skill_check_dc_range() {
        let sub = Submission::new(
            ContentKind::SkillCheck,
            vec![
                json!({"skill": "Athletics", "description": "Climb the wall", "dc": 31}),
                json!({"skill": "", "description": "Read the runes", "dc": 5}),
            ],
        );
        let report = validate_submission(&sub, None);
        assert_eq!(
            messages(&report),
            vec!["dc 31 is outside 5..=30".to_string(), "skill is empty".to_string()]
        );
    }

    #[test]
    fn danger_weight_and_long_title() {
        let long = "A".repeat(MAX_TITLE_CHARS + 1);
        let sub = Submission::new(
            ContentKind::Danger,
            vec![json!({
                "title": long,
                "description": "It hurts.",
                "severity": "deadly",
                "environments": ["swamp", "swamp"],
                "weight": 0
            })],
        );
        let report = validate_submission(&sub, None);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 2);
    }

    #[test]
    fn oversized_weight_rejected() {
        let mut entry = encounter("Heavy Toll");
        entry["weight"] = json!(3_000_000_000u64);
        let sub = Submission::new(ContentKind::Encounter, vec![entry]);
        assert_eq!(
            messages(&validate_submission(&sub, None)),
            vec!["weight 3000000000 is above the maximum of 1000"]
        );
    }

    #[test]
    fn empty_key_names_its_field() {
        let sub = Submission::new(
            ContentKind::SkillCheck,
            vec![json!({"skill": "Stealth", "description": "  ", "dc": 12})],
        );
        assert_eq!(messages(&validate_submission(&sub, None)), vec!["description is empty"]);

        let sub = Submission::new(
            ContentKind::Npc,
            vec![json!({
                "archetype": "",
                "names": ["Ada", "Bram", "Cole"],
                "appearances": ["tall", "scarred", "freckled"],
                "personalities": ["blunt", "shy", "merry"],
                "motivations": ["gold", "revenge", "home"]
            })],
        );
        assert_eq!(messages(&validate_submission(&sub, None)), vec!["archetype is empty"]);
    }

    #[test]
    fn empty_submission_warns() {
        let report = validate_submission(&Submission::new(ContentKind::Danger, vec![]), None);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.issues[0].entry, None);
    }
}
