//! Undo/redo history management.
//!
//! A command-pattern history: every mutation is a [`Command`] that knows how
//! to apply and revert itself. Histories are bounded; once the limit is
//! reached the oldest command is forgotten.

use std::collections::VecDeque;
use thiserror::Error;

/// Default number of commands kept for undo.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },
}

impl HistoryError {
    pub fn failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// A reversible mutation of some state `S`.
pub trait Command<S> {
    /// Apply the command.
    fn execute(&mut self, state: &mut S) -> Result<(), HistoryError>;

    /// Revert a previous `execute`.
    fn undo(&mut self, state: &mut S) -> Result<(), HistoryError>;

    /// Human-readable description of what this command does.
    fn description(&self) -> String;
}

/// Linear undo/redo history over state `S`.
///
/// Executing a new command after an undo discards the redo stack: the last
/// command wins.
pub struct CommandHistory<S> {
    /// Most recent command = back of deque.
    undo_stack: VecDeque<Box<dyn Command<S>>>,
    /// Most recent undone command = back of vec.
    redo_stack: Vec<Box<dyn Command<S>>>,
    limit: usize,
}

impl<S> CommandHistory<S> {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// A history keeping at most `limit` undoable commands (minimum 1).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Execute a command and record it. A failing command is not recorded
    /// and leaves the redo stack untouched.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command<S>>,
        state: &mut S,
    ) -> Result<(), HistoryError> {
        command.execute(state)?;
        tracing::debug!("Executed: {}", command.description());

        self.undo_stack.push_back(command);
        if self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        Ok(())
    }

    /// Undo the most recent command. Returns its description, or `None`
    /// when there is nothing to undo.
    pub fn undo(&mut self, state: &mut S) -> Result<Option<String>, HistoryError> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        if let Err(e) = command.undo(state) {
            self.undo_stack.push_back(command);
            return Err(e);
        }
        let description = command.description();
        tracing::debug!("Undid: {}", description);
        self.redo_stack.push(command);
        Ok(Some(description))
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, state: &mut S) -> Result<Option<String>, HistoryError> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = command.execute(state) {
            self.redo_stack.push(command);
            return Err(e);
        }
        let description = command.description();
        tracing::debug!("Redid: {}", description);
        self.undo_stack.push_back(command);
        Ok(Some(description))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Description of the command `undo` would revert.
    pub fn peek_undo(&self) -> Option<String> {
        self.undo_stack.back().map(|c| c.description())
    }

    pub fn peek_redo(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl<S> Default for CommandHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for CommandHistory<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHistory")
            .field("undo_depth", &self.undo_depth())
            .field("redo_depth", &self.redo_depth())
            .field("limit", &self.limit)
            .finish()
    }
}
