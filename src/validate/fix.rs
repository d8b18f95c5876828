/// Auto-fix for the mechanical problems contributors hit most often.
///
/// Fixes work on the raw JSON so they also apply to entries that do not
/// parse yet.

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

use super::Submission;
use crate::schema::{normalize_key, MAX_WEIGHT};

/// Fields that identify a record; internal whitespace is collapsed too.
const KEY_FIELDS: &[&str] = &["title", "name", "archetype", "skill"];

/// Lists whose items are lowercased.
const LOWERCASE_LISTS: &[&str] = &["tags", "environments"];

/// Apply every fix in place. Returns one log line per change.
pub fn fix_submission(submission: &mut Submission) -> Vec<String> {
    let mut log = Vec::new();

    if let Some(author) = &mut submission.author {
        let trimmed = author.trim().to_string();
        if trimmed != *author {
            *author = trimmed;
            log.push("trimmed whitespace in author".to_string());
        }
    }

    for (index, entry) in submission.entries.iter_mut().enumerate() {
        if let Some(fields) = entry.as_object_mut() {
            for fix in fix_entry(fields) {
                log.push(format!("entry {}: {}", index, fix));
            }
        }
    }

    if !log.is_empty() {
        tracing::info!("Applied {} fixes to {} submission", log.len(), submission.kind);
    }
    log
}

fn fix_entry(fields: &mut Map<String, Value>) -> Vec<String> {
    let mut fixes = Vec::new();
    for (field, value) in fields.iter_mut() {
        if field == "weight" {
            match value.as_u64() {
                Some(0) => {
                    *value = Value::from(1u32);
                    fixes.push("raised weight from 0 to 1".to_string());
                }
                Some(w) if w > u64::from(MAX_WEIGHT) => {
                    *value = Value::from(MAX_WEIGHT);
                    fixes.push(format!("lowered weight from {} to {}", w, MAX_WEIGHT));
                }
                _ => {}
            }
            continue;
        }
        match value {
            Value::String(text) => {
                let fixed = clean_text(field, text);
                if fixed != *text {
                    *text = fixed;
                    fixes.push(format!("trimmed whitespace in {}", field));
                }
            }
            Value::Array(items) => fix_list(field, items, &mut fixes),
            _ => {}
        }
    }
    fixes
}

fn clean_text(field: &str, text: &str) -> String {
    if KEY_FIELDS.contains(&field) {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.trim().to_string()
    }
}

/// Trim string items, drop empty ones and remove duplicates (first one
/// wins). Non-string items are left alone.
fn fix_list(field: &str, items: &mut Vec<Value>, fixes: &mut Vec<String>) {
    let lowercase = LOWERCASE_LISTS.contains(&field);
    let mut trimmed = false;
    let mut lowered = false;
    let mut empty = 0;
    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(items.len());

    for item in items.drain(..) {
        let text = match item {
            Value::String(text) => text,
            other => {
                kept.push(other);
                continue;
            }
        };
        let mut fixed = text.trim().to_string();
        trimmed |= fixed != text;
        if lowercase && fixed != fixed.to_lowercase() {
            fixed = fixed.to_lowercase();
            lowered = true;
        }
        if fixed.is_empty() {
            empty += 1;
        } else if !seen.insert(normalize_key(&fixed)) {
            fixes.push(format!("removed duplicate '{}' from {}", fixed, field));
        } else {
            kept.push(Value::String(fixed));
        }
    }
    *items = kept;

    if trimmed {
        fixes.push(format!("trimmed whitespace in {}", field));
    }
    if lowered {
        fixes.push(format!("lowercased {}", field));
    }
    if empty > 0 {
        fixes.push(format!("removed {} empty item(s) from {}", empty, field));
    }
}
