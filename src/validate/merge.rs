/// Merging validated submissions into the production tables.

use std::path::{Path, PathBuf};

use super::{validate_submission, Submission, ValidateError};
use crate::core::content::{ContentKind, ContentLibrary};
use crate::core::storage::write_atomic;
use crate::schema::normalize_key;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub kind: ContentKind,
    pub table: PathBuf,
    /// Keys appended to the table.
    pub added: Vec<String>,
    /// Keys already present in production.
    pub skipped: Vec<String>,
    /// False for dry runs and when nothing was added.
    pub written: bool,
}

/// Append a submission's entries to its table in `data_dir`.
///
/// The submission must validate without errors. Entries whose key already
/// exists in production are skipped rather than rejected, so re-running a
/// merge is harmless. A missing table file is created.
pub fn merge_submission(
    submission: &Submission,
    data_dir: &Path,
    dry_run: bool,
) -> Result<MergeOutcome, ValidateError> {
    let kind = submission.kind;
    let report = validate_submission(submission, None);
    if report.has_errors() {
        return Err(ValidateError::Rejected(report.error_count()));
    }

    let table = kind.path_in(data_dir);
    let mut library = ContentLibrary::default();
    if table.exists() {
        library.load_table_file(kind, data_dir)?;
    }
    let mut existing = library.keys(kind);

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for entry in &submission.entries {
        let key = entry_key(entry);
        if existing.contains(&normalize_key(&key)) {
            tracing::info!("Skipping '{}': already in {}", key, table.display());
            skipped.push(key);
            continue;
        }
        let key = library.push_record(kind, entry.clone())?;
        existing.push(normalize_key(&key));
        added.push(key);
    }

    let written = !dry_run && !added.is_empty();
    if written {
        let mut json = library.table_to_json(kind)?;
        json.push('\n');
        write_atomic(&table, json.as_bytes())?;
        tracing::info!("Merged {} {} entries into {}", added.len(), kind, table.display());
    }

    Ok(MergeOutcome {
        kind,
        table,
        added,
        skipped,
        written,
    })
}

fn entry_key(entry: &serde_json::Value) -> String {
    ["title", "name", "archetype", "description"]
        .iter()
        .find_map(|field| entry.get(*field).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn danger(title: &str) -> serde_json::Value {
        json!({"title": title, "description": "Watch out.", "severity": "minor"})
    }

    fn seed_table(dir: &Path) {
        std::fs::write(
            ContentKind::Danger.path_in(dir),
            serde_json::to_string(&json!([danger("Quicksand")])).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn merge_appends_and_skips_existing() {
        let dir = tempdir().unwrap();
        seed_table(dir.path());

        let sub = Submission::new(ContentKind::Danger, vec![danger("Rockslide"), danger("quicksand")]);
        let outcome = merge_submission(&sub, dir.path(), false).unwrap();
        assert_eq!(outcome.added, vec!["Rockslide".to_string()]);
        assert_eq!(outcome.skipped, vec!["quicksand".to_string()]);
        assert!(outcome.written);

        let mut library = ContentLibrary::default();
        assert_eq!(library.load_table_file(ContentKind::Danger, dir.path()).unwrap(), 2);
        assert_eq!(library.dangers[1].title, "Rockslide");

        // Second run adds nothing
        let again = merge_submission(&sub, dir.path(), false).unwrap();
        assert!(again.added.is_empty());
        assert!(!again.written);
    }

    #[test]
    fn dry_run_leaves_table_alone() {
        let dir = tempdir().unwrap();
        seed_table(dir.path());
        let before = std::fs::read_to_string(ContentKind::Danger.path_in(dir.path())).unwrap();

        let sub = Submission::new(ContentKind::Danger, vec![danger("Rockslide")]);
        let outcome = merge_submission(&sub, dir.path(), true).unwrap();
        assert_eq!(outcome.added.len(), 1);
        assert!(!outcome.written);

        let after = std::fs::read_to_string(ContentKind::Danger.path_in(dir.path())).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn invalid_submission_rejected() {
        let dir = tempdir().unwrap();
        let sub = Submission::new(
            ContentKind::Danger,
            vec![json!({"title": "Oops", "description": "", "severity": "catastrophic"})],
        );
        assert!(matches!(
            merge_submission(&sub, dir.path(), false),
            Err(ValidateError::Rejected(1))
        ));
        assert!(!ContentKind::Danger.path_in(dir.path()).exists());
    }

    #[test]
    fn missing_table_is_created() {
        let dir = tempdir().unwrap();
        let sub = Submission::new(ContentKind::Danger, vec![danger("Rockslide")]);
        let outcome = merge_submission(&sub, dir.path(), false).unwrap();
        assert!(outcome.written);
        assert!(outcome.table.exists());
    }
}
