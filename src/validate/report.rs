/// Markdown rendering of validation results, for pull request comments.

use std::fmt::Write as _;

use super::{Issue, ValidationReport};

impl ValidationReport {
    /// One-line status, e.g. `encounter: 3 entries, 1 error, 2 warnings`.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} {}, {} {}, {} {}",
            self.kind,
            self.entries,
            plural(self.entries, "entry", "entries"),
            self.error_count(),
            plural(self.error_count(), "error", "errors"),
            self.warning_count(),
            plural(self.warning_count(), "warning", "warnings"),
        )
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_markdown(&mut out);
        out
    }

    fn write_markdown(&self, out: &mut String) -> std::fmt::Result {
        let status = if self.has_errors() { "❌ Failed" } else { "✅ Passed" };
        match &self.source {
            Some(source) => writeln!(out, "## {} `{}`", status, source)?,
            None => writeln!(out, "## {}", status)?,
        }
        writeln!(out)?;
        writeln!(out, "{}", self.summary())?;

        write_section(out, "Errors", self.errors())?;
        write_section(out, "Warnings", self.warnings())?;
        Ok(())
    }
}

/// Combined report for several submissions.
pub fn combined_markdown(reports: &[ValidationReport]) -> String {
    let failed = reports.iter().filter(|r| r.has_errors()).count();
    let mut out = format!(
        "# Content validation\n\n{} of {} submission(s) passed.\n",
        reports.len() - failed,
        reports.len()
    );
    for report in reports {
        out.push('\n');
        out.push_str(&report.to_markdown());
    }
    out
}

fn write_section<'a>(
    out: &mut String,
    heading: &str,
    issues: impl Iterator<Item = &'a Issue>,
) -> std::fmt::Result {
    let mut issues = issues.peekable();
    if issues.peek().is_none() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "### {}", heading)?;
    writeln!(out)?;
    for issue in issues {
        let location = match (issue.entry, &issue.key) {
            (Some(i), Some(key)) => format!("entry {} (`{}`)", i, key),
            (Some(i), None) => format!("entry {}", i),
            _ => "file".to_string(),
        };
        writeln!(out, "- **{}**: {}", location, issue.message)?;
    }
    Ok(())
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}
