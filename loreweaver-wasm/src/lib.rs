//! WASM bindings for the loreweaver single-page app.
//!
//! Content tables are compiled into the binary. Persistence stays on the
//! JavaScript side: the page passes its `localStorage` snapshot to the
//! constructor and writes `storeSnapshot()` back after each change.

use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use loreweaver::core::changelog::Changelog;
use loreweaver::core::content::{ContentKind, ContentLibrary};
use loreweaver::core::events::AppEvent;
use loreweaver::core::export::ExportFormat;
use loreweaver::core::generator::{EncounterGenerator, GeneratedEncounter};
use loreweaver::core::history::DEFAULT_HISTORY_LIMIT;
use loreweaver::core::session::Session;
use loreweaver::core::storage::{KeyValueStore, MemoryStore, Preferences, Theme};
use loreweaver::schema::environment::Environment;

// ---------------------------------------------------------------------------
// Embedded content, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const ENCOUNTERS: &str = include_str!("../../data/encounters.json");
    pub const LOCATIONS: &str = include_str!("../../data/locations.json");
    pub const NPCS: &str = include_str!("../../data/npcs.json");
    pub const SKILL_CHECKS: &str = include_str!("../../data/skill_checks.json");
    pub const DANGERS: &str = include_str!("../../data/dangers.json");
    pub const CHANGELOG: &str = include_str!("../../data/changelog.json");
}

fn embedded_library() -> Result<ContentLibrary, JsError> {
    ContentLibrary::from_json(&[
        (ContentKind::Encounter, data::ENCOUNTERS),
        (ContentKind::Location, data::LOCATIONS),
        (ContentKind::Npc, data::NPCS),
        (ContentKind::SkillCheck, data::SKILL_CHECKS),
        (ContentKind::Danger, data::DANGERS),
    ])
    .map_err(|e| JsError::new(&format!("Content error: {e}")))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("JSON error: {e}")))
}

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// Event notifications queued for the page, drained with `takeEvents()`.
#[derive(serde::Serialize)]
struct EventInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl From<&AppEvent> for EventInfo {
    fn from(event: &AppEvent) -> Self {
        let detail = match event {
            AppEvent::EncounterGenerated(enc) => Some(enc.title.clone()),
            AppEvent::EnvironmentChanged(env) => env.map(|e| e.to_string()),
            AppEvent::FiltersChanged(filter) => Some(filter.describe()),
            AppEvent::HistoryChanged { can_undo, can_redo } => {
                Some(format!("undo={can_undo} redo={can_redo}"))
            }
            AppEvent::EncounterSaved { id, .. } => Some(id.to_string()),
            AppEvent::EncounterCleared => None,
        };
        EventInfo {
            kind: format!("{:?}", event.kind()),
            detail,
        }
    }
}

// ---------------------------------------------------------------------------
// LoreWeaver, the exported session object
// ---------------------------------------------------------------------------

#[wasm_bindgen]
pub struct LoreWeaver {
    session: Session,
    prefs: Preferences<MemoryStore>,
    changelog: Changelog,
    events: Rc<RefCell<Vec<EventInfo>>>,
}

#[wasm_bindgen]
impl LoreWeaver {
    /// Create an instance seeded with `seed`. `store_json` is a JSON object
    /// of previously persisted key/value pairs, if any.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, store_json: Option<String>) -> Result<LoreWeaver, JsError> {
        let generator = EncounterGenerator::builder()
            .seed(seed)
            .with_library(embedded_library()?)
            .build()
            .map_err(|e| JsError::new(&format!("Generator build error: {e}")))?;

        let mut store = MemoryStore::new();
        if let Some(json) = store_json {
            let entries: std::collections::BTreeMap<String, String> = serde_json::from_str(&json)
                .map_err(|e| JsError::new(&format!("Invalid store JSON: {e}")))?;
            for (key, value) in entries {
                store.set(&key, value).map_err(js_err)?;
            }
        }

        let changelog = Changelog::from_json(data::CHANGELOG).map_err(js_err)?;

        let mut session = Session::new(generator, DEFAULT_HISTORY_LIMIT);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session
            .bus_mut()
            .subscribe(None, move |event| sink.borrow_mut().push(EventInfo::from(event)));

        Ok(LoreWeaver {
            session,
            prefs: Preferences::new(store),
            changelog,
            events,
        })
    }

    /// Environment names, for building the picker.
    pub fn environments() -> Result<String, JsError> {
        let names: Vec<&str> = Environment::ALL.iter().map(|e| e.name()).collect();
        to_json(&names)
    }

    /// Generate a new encounter; returns it as JSON.
    pub fn generate(&mut self) -> Result<String, JsError> {
        let encounter = self.session.generate().map_err(js_err)?;
        to_json(encounter)
    }

    #[wasm_bindgen(js_name = rerollLocation)]
    pub fn reroll_location(&mut self) -> Result<String, JsError> {
        let encounter = self.session.reroll_location().map_err(js_err)?;
        to_json(encounter)
    }

    #[wasm_bindgen(js_name = rerollNpcs)]
    pub fn reroll_npcs(&mut self) -> Result<String, JsError> {
        let encounter = self.session.reroll_npcs().map_err(js_err)?;
        to_json(encounter)
    }

    /// The current encounter as JSON, if any.
    pub fn current(&self) -> Result<Option<String>, JsError> {
        self.session.current().map(to_json).transpose()
    }

    /// Set the environment by name; `""` or `"any"` clears it.
    #[wasm_bindgen(js_name = setEnvironment)]
    pub fn set_environment(&mut self, name: &str) -> Result<bool, JsError> {
        let env = match name.trim() {
            "" | "any" => None,
            other => Some(other.parse::<Environment>().map_err(js_err)?),
        };
        self.session.set_environment(env).map_err(js_err)
    }

    #[wasm_bindgen(js_name = includeTag)]
    pub fn include_tag(&mut self, tag: &str) -> Result<bool, JsError> {
        self.session.include_tag(tag).map_err(js_err)
    }

    #[wasm_bindgen(js_name = excludeTag)]
    pub fn exclude_tag(&mut self, tag: &str) -> Result<bool, JsError> {
        self.session.exclude_tag(tag).map_err(js_err)
    }

    #[wasm_bindgen(js_name = removeTag)]
    pub fn remove_tag(&mut self, tag: &str) -> Result<bool, JsError> {
        self.session.remove_tag(tag).map_err(js_err)
    }

    #[wasm_bindgen(js_name = clearFilters)]
    pub fn clear_filters(&mut self) -> Result<bool, JsError> {
        self.session.clear_filters().map_err(js_err)
    }

    /// Undo the last action; returns its description.
    pub fn undo(&mut self) -> Result<Option<String>, JsError> {
        self.session.undo().map_err(js_err)
    }

    pub fn redo(&mut self) -> Result<Option<String>, JsError> {
        self.session.redo().map_err(js_err)
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.session.history().can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.session.history().can_redo()
    }

    /// Render the current encounter as markdown, text, json or html.
    #[wasm_bindgen(js_name = exportCurrent)]
    pub fn export_current(&self, format: &str) -> Result<String, JsError> {
        let format: ExportFormat = format.parse().map_err(js_err)?;
        let encounter: &GeneratedEncounter = self
            .session
            .current()
            .ok_or_else(|| JsError::new("Nothing generated yet"))?;
        format.exporter().export(encounter).map_err(js_err)
    }

    /// Save the current encounter; returns the new id.
    pub fn save(&mut self, label: Option<String>) -> Result<String, JsError> {
        let id = self
            .session
            .save_current(&mut self.prefs, label.as_deref())
            .map_err(js_err)?;
        Ok(id.to_string())
    }

    #[wasm_bindgen(js_name = savedEncounters)]
    pub fn saved_encounters(&self) -> Result<String, JsError> {
        to_json(&self.prefs.saved_encounters())
    }

    /// Make a saved encounter current again (undoable).
    #[wasm_bindgen(js_name = loadSaved)]
    pub fn load_saved(&mut self, id: &str) -> Result<String, JsError> {
        let saved = self
            .prefs
            .find_saved(id)
            .ok_or_else(|| JsError::new(&format!("No saved encounter {id}")))?;
        self.session.load_encounter(saved.encounter).map_err(js_err)?;
        self.current()?.ok_or_else(|| JsError::new("Nothing loaded"))
    }

    #[wasm_bindgen(js_name = deleteSaved)]
    pub fn delete_saved(&mut self, id: &str) -> Result<bool, JsError> {
        match self.prefs.find_saved(id) {
            Some(saved) => self.prefs.remove_saved(saved.id).map_err(js_err),
            None => Ok(false),
        }
    }

    pub fn theme(&self) -> String {
        self.prefs.theme().to_string()
    }

    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&mut self, theme: &str) -> Result<(), JsError> {
        let theme: Theme = theme.parse().map_err(js_err)?;
        self.prefs.set_theme(theme).map_err(js_err)
    }

    #[wasm_bindgen(js_name = progressiveReveal)]
    pub fn progressive_reveal(&self) -> bool {
        self.prefs.progressive_reveal()
    }

    #[wasm_bindgen(js_name = setProgressiveReveal)]
    pub fn set_progressive_reveal(&mut self, enabled: bool) -> Result<(), JsError> {
        self.prefs.set_progressive_reveal(enabled).map_err(js_err)
    }

    /// Unseen changelog entries as JSON; marks them seen.
    #[wasm_bindgen(js_name = whatsNew)]
    pub fn whats_new(&mut self, current_version: &str) -> Result<String, JsError> {
        let entries = self
            .changelog
            .whats_new(&mut self.prefs, current_version)
            .map_err(js_err)?;
        to_json(&entries)
    }

    /// Events emitted since the last call, as JSON.
    #[wasm_bindgen(js_name = takeEvents)]
    pub fn take_events(&mut self) -> Result<String, JsError> {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        to_json(&events)
    }

    /// Every persisted key/value pair, for writing back to `localStorage`.
    #[wasm_bindgen(js_name = storeSnapshot)]
    pub fn store_snapshot(&self) -> Result<String, JsError> {
        let store = self.prefs.store();
        let entries: std::collections::BTreeMap<String, String> = store
            .keys()
            .into_iter()
            .filter_map(|key| store.get(&key).map(|value| (key, value)))
            .collect();
        to_json(&entries)
    }
}
