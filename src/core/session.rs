/// Interactive session: the user's current environment, filters and
/// encounter, mutated only through undoable commands.

use thiserror::Error;
use uuid::Uuid;

use crate::core::events::{AppEvent, EventBus};
use crate::core::generator::{EncounterGenerator, GenerateError, GeneratedEncounter, GenerationRequest};
use crate::core::history::{Command, CommandHistory, HistoryError};
use crate::core::selection::TagFilter;
use crate::core::storage::{KeyValueStore, Preferences, StorageError};
use crate::schema::environment::Environment;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no encounter has been generated yet")]
    NoCurrentEncounter,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub environment: Option<Environment>,
    pub filter: TagFilter,
    pub current: Option<GeneratedEncounter>,
}

impl SessionState {
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest::new(self.environment).with_filter(self.filter.clone())
    }
}

/// Replaces one field of the session state. Executing and undoing are both
/// a swap, so the command holds whichever value is not currently live.
struct SwapField<T> {
    label: String,
    value: T,
    field: fn(&mut SessionState) -> &mut T,
}

impl<T> Command<SessionState> for SwapField<T> {
    fn execute(&mut self, state: &mut SessionState) -> Result<(), HistoryError> {
        std::mem::swap((self.field)(state), &mut self.value);
        Ok(())
    }

    fn undo(&mut self, state: &mut SessionState) -> Result<(), HistoryError> {
        std::mem::swap((self.field)(state), &mut self.value);
        Ok(())
    }

    fn description(&self) -> String {
        self.label.clone()
    }
}

fn environment_field(state: &mut SessionState) -> &mut Option<Environment> {
    &mut state.environment
}

fn filter_field(state: &mut SessionState) -> &mut TagFilter {
    &mut state.filter
}

fn current_field(state: &mut SessionState) -> &mut Option<GeneratedEncounter> {
    &mut state.current
}

/// Select a new environment.
pub struct SetEnvironment;

impl SetEnvironment {
    pub fn command(environment: Option<Environment>) -> Box<dyn Command<SessionState>> {
        let label = match environment {
            Some(env) => format!("set environment to {}", env),
            None => "clear environment".to_string(),
        };
        Box::new(SwapField {
            label,
            value: environment,
            field: environment_field,
        })
    }
}

/// Replace the active tag filter.
pub struct ChangeFilter;

impl ChangeFilter {
    pub fn command(label: impl Into<String>, filter: TagFilter) -> Box<dyn Command<SessionState>> {
        Box::new(SwapField {
            label: label.into(),
            value: filter,
            field: filter_field,
        })
    }
}

/// Replace (or clear) the current encounter.
pub struct ReplaceEncounter;

impl ReplaceEncounter {
    pub fn command(
        label: impl Into<String>,
        encounter: Option<GeneratedEncounter>,
    ) -> Box<dyn Command<SessionState>> {
        Box::new(SwapField {
            label: label.into(),
            value: encounter,
            field: current_field,
        })
    }
}

/// A generator, its session state, undo history and event bus, wired
/// together.
pub struct Session {
    generator: EncounterGenerator,
    state: SessionState,
    history: CommandHistory<SessionState>,
    bus: EventBus,
}

impl Session {
    pub fn new(generator: EncounterGenerator, history_limit: usize) -> Self {
        Self {
            generator,
            state: SessionState::default(),
            history: CommandHistory::with_limit(history_limit),
            bus: EventBus::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<&GeneratedEncounter> {
        self.state.current.as_ref()
    }

    pub fn history(&self) -> &CommandHistory<SessionState> {
        &self.history
    }

    pub fn generator(&self) -> &EncounterGenerator {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut EncounterGenerator {
        &mut self.generator
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Generate a new encounter for the current environment and filters.
    pub fn generate(&mut self) -> Result<&GeneratedEncounter, SessionError> {
        let encounter = self.generator.generate(&self.state.request())?;
        let label = format!("generate '{}'", encounter.title);
        self.apply(ReplaceEncounter::command(label, Some(encounter)))?;
        self.current().ok_or(SessionError::NoCurrentEncounter)
    }

    pub fn reroll_location(&mut self) -> Result<&GeneratedEncounter, SessionError> {
        let current = self.state.current.as_ref().ok_or(SessionError::NoCurrentEncounter)?;
        let next = self.generator.reroll_location(current)?;
        self.apply(ReplaceEncounter::command("reroll location", Some(next)))?;
        self.current().ok_or(SessionError::NoCurrentEncounter)
    }

    pub fn reroll_npcs(&mut self) -> Result<&GeneratedEncounter, SessionError> {
        let current = self.state.current.as_ref().ok_or(SessionError::NoCurrentEncounter)?;
        let next = self.generator.reroll_npcs(current)?;
        self.apply(ReplaceEncounter::command("reroll NPCs", Some(next)))?;
        self.current().ok_or(SessionError::NoCurrentEncounter)
    }

    /// Show a previously saved encounter as the current one.
    pub fn load_encounter(&mut self, encounter: GeneratedEncounter) -> Result<(), SessionError> {
        let label = format!("load '{}'", encounter.title);
        self.apply(ReplaceEncounter::command(label, Some(encounter)))
    }

    /// Returns false when nothing was showing.
    pub fn clear_encounter(&mut self) -> Result<bool, SessionError> {
        if self.state.current.is_none() {
            return Ok(false);
        }
        self.apply(ReplaceEncounter::command("clear encounter", None))?;
        Ok(true)
    }

    /// Returns false (and records nothing) when the environment is unchanged.
    pub fn set_environment(&mut self, environment: Option<Environment>) -> Result<bool, SessionError> {
        if self.state.environment == environment {
            return Ok(false);
        }
        self.apply(SetEnvironment::command(environment))?;
        Ok(true)
    }

    pub fn include_tag(&mut self, tag: &str) -> Result<bool, SessionError> {
        let next = self.state.filter.clone().include(tag);
        self.change_filter(format!("include tag '{}'", tag), next)
    }

    pub fn exclude_tag(&mut self, tag: &str) -> Result<bool, SessionError> {
        let next = self.state.filter.clone().exclude(tag);
        self.change_filter(format!("exclude tag '{}'", tag), next)
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<bool, SessionError> {
        let next = self.state.filter.clone().without(tag);
        self.change_filter(format!("remove tag '{}'", tag), next)
    }

    pub fn clear_filters(&mut self) -> Result<bool, SessionError> {
        self.change_filter("clear filters", TagFilter::new())
    }

    fn change_filter(
        &mut self,
        label: impl Into<String>,
        next: TagFilter,
    ) -> Result<bool, SessionError> {
        if self.state.filter == next {
            return Ok(false);
        }
        self.apply(ChangeFilter::command(label, next))?;
        Ok(true)
    }

    /// Returns the description of the undone command.
    pub fn undo(&mut self) -> Result<Option<String>, SessionError> {
        let before = self.state.clone();
        let undone = self.history.undo(&mut self.state)?;
        if undone.is_some() {
            self.announce(&before);
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<Option<String>, SessionError> {
        let before = self.state.clone();
        let redone = self.history.redo(&mut self.state)?;
        if redone.is_some() {
            self.announce(&before);
        }
        Ok(redone)
    }

    /// Save the current encounter. Saving is not an undoable action.
    pub fn save_current<S: KeyValueStore>(
        &mut self,
        prefs: &mut Preferences<S>,
        label: Option<&str>,
    ) -> Result<Uuid, SessionError> {
        let current = self.current().ok_or(SessionError::NoCurrentEncounter)?;
        let saved = prefs.save_encounter(current, label)?;
        self.bus.emit(&AppEvent::EncounterSaved {
            id: saved.id,
            title: saved.encounter.title.clone(),
        });
        Ok(saved.id)
    }

    fn apply(&mut self, command: Box<dyn Command<SessionState>>) -> Result<(), SessionError> {
        let before = self.state.clone();
        tracing::debug!("Applying '{}'", command.description());
        self.history.execute(command, &mut self.state)?;
        self.announce(&before);
        Ok(())
    }

    /// Emit one event per changed field, then the history status.
    fn announce(&mut self, before: &SessionState) {
        if before.environment != self.state.environment {
            self.bus.emit(&AppEvent::EnvironmentChanged(self.state.environment));
        }
        if before.filter != self.state.filter {
            self.bus.emit(&AppEvent::FiltersChanged(self.state.filter.clone()));
        }
        if before.current != self.state.current {
            let event = match &self.state.current {
                Some(enc) => AppEvent::EncounterGenerated(Box::new(enc.clone())),
                None => AppEvent::EncounterCleared,
            };
            self.bus.emit(&event);
        }
        self.bus.emit(&AppEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("history", &self.history)
            .finish()
    }
}
