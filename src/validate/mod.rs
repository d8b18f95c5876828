//! Community content submissions: validation, auto-fix, merge and reports.
//!
//! A submission is a JSON file naming the table it targets and carrying the
//! new entries:
//!
//! ```json
//! { "kind": "encounter", "author": "someone", "entries": [ { ... } ] }
//! ```
//!
//! Entries stay as raw JSON until validated so that a single malformed entry
//! is reported instead of failing the whole file.

pub mod fix;
pub mod merge;
pub mod report;
mod rules;
pub mod schema;

pub use fix::fix_submission;
pub use merge::{merge_submission, MergeOutcome};
pub use rules::validate_submission;
pub use schema::submission_schema;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::content::{ContentError, ContentKind};
use crate::core::storage::{write_atomic, StorageError};

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid submission file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("submission has {0} validation error(s); fix them before merging")]
    Rejected(usize),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Submission {
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub entries: Vec<serde_json::Value>,
}

impl Submission {
    pub fn new(kind: ContentKind, entries: Vec<serde_json::Value>) -> Self {
        Self {
            kind,
            author: None,
            entries,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ValidateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ValidateError> {
        let json = std::fs::read_to_string(path).map_err(|source| ValidateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ValidateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rewrite the submission file in place; a failed write leaves the old
    /// file intact.
    pub fn save(&self, path: &Path) -> Result<(), ValidateError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// One finding. `entry` is the index in the submission, `None` for
/// file-level issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub entry: Option<usize>,
    pub key: Option<String>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity.to_string().to_uppercase())?;
        match (self.entry, &self.key) {
            (Some(i), Some(key)) => write!(f, " [entry {} '{}']", i, key)?,
            (Some(i), None) => write!(f, " [entry {}]", i)?,
            _ => {}
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Where the submission came from, for display.
    pub source: Option<String>,
    pub kind: ContentKind,
    pub entries: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn new(kind: ContentKind, entries: usize) -> Self {
        Self {
            source: None,
            kind,
            entries,
            issues: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn push(
        &mut self,
        severity: Severity,
        entry: Option<usize>,
        key: Option<&str>,
        message: impl Into<String>,
    ) {
        self.issues.push(Issue {
            severity,
            entry,
            key: key.map(str::to_string),
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Issues for one entry.
    pub fn issues_for(&self, entry: usize) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.entry == Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submission_parses_with_optional_author() {
        let sub = Submission::from_json(r#"{"kind": "npc", "entries": []}"#).unwrap();
        assert_eq!(sub.kind, ContentKind::Npc);
        assert_eq!(sub.author, None);
        assert!(Submission::from_json(r#"{"kind": "npc", "entries": [], "extra": 1}"#).is_err());
        assert!(Submission::from_json(r#"{"kind": "monster", "entries": []}"#).is_err());
    }

    #[test]
    fn submission_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.json");
        let mut sub = Submission::new(ContentKind::Danger, vec![json!({"title": "x"})]);
        sub.author = Some("tester".to_string());
        sub.save(&path).unwrap();
        assert_eq!(Submission::load(&path).unwrap(), sub);
    }

    #[test]
    fn save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.json");
        std::fs::write(&path, "{ half written").unwrap();

        let sub = Submission::new(ContentKind::Npc, vec![]);
        sub.save(&path).unwrap();
        assert_eq!(Submission::load(&path).unwrap(), sub);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);

        // Target is a directory: the write fails and nothing is replaced
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        assert!(matches!(sub.save(&blocked), Err(ValidateError::Storage(_))));
        assert!(blocked.is_dir());
    }

    #[test]
    fn load_reports_path_on_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{").unwrap();
        let err = Submission::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn issue_display() {
        let mut report = ValidationReport::new(ContentKind::Encounter, 1);
        report.push(Severity::Error, Some(0), Some("Bandit Toll"), "needs at least 2 resolutions");
        report.push(Severity::Warning, None, None, "no author");
        assert_eq!(
            report.issues[0].to_string(),
            "ERROR [entry 0 'Bandit Toll']: needs at least 2 resolutions"
        );
        assert_eq!(report.issues[1].to_string(), "WARNING: no author");
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.issues_for(0).count(), 1);
    }
}
