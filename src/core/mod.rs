//! The generator engine: content loading, selection, templating, sessions
//! with undo/redo, exports and persistence.

pub mod changelog;
pub mod config;
pub mod content;
pub mod context;
pub mod events;
pub mod export;
pub mod generator;
pub mod history;
pub mod selection;
pub mod session;
pub mod storage;
pub mod template;

#[cfg(test)]
pub(crate) mod test_support;
