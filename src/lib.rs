//! LoreWeaver: a tabletop RPG encounter generator.
//!
//! Composes encounters, locations and NPCs by weighted random selection over
//! static JSON content tables, renders description templates, and keeps an
//! undoable session. The `validate` module checks and merges community
//! content submissions before they reach the production tables.

pub mod core;
pub mod schema;
pub mod validate;
