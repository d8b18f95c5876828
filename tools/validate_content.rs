/// Content validator: checks community submissions before they are merged.
///
/// Usage: validate_content <files...> [--fix] [--report <path>] [--check-production] [--data-dir <dir>]
///        validate_content --schema <kind>
///
/// Exits 0 when no submission has errors, 1 otherwise. Warnings never fail.

use anyhow::{Context, Result};
use clap::Parser;
use loreweaver::core::content::{ContentKind, ContentLibrary};
use loreweaver::validate::report::combined_markdown;
use loreweaver::validate::{
    fix_submission, submission_schema, validate_submission, Submission, ValidationReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "validate_content")]
#[command(about = "Validate LoreWeaver content submissions", long_about = None)]
#[command(version)]
struct Cli {
    /// Submission files
    #[arg(required_unless_present = "schema", value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Print the JSON Schema for submissions of this kind and exit
    #[arg(long, value_name = "KIND", conflicts_with = "files")]
    schema: Option<String>,

    /// Apply automatic fixes and rewrite the files before validating
    #[arg(long)]
    fix: bool,

    /// Write a Markdown report to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Also reject entries that duplicate the production tables
    #[arg(long)]
    check_production: bool,

    /// Directory holding the production tables
    #[arg(long, value_name = "DIR", env = "LOREWEAVER_DATA", default_value = "data")]
    data_dir: PathBuf,
}

fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_env("LOREWEAVER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(kind) = &cli.schema {
        let kind: ContentKind = kind.parse()?;
        println!("{}", serde_json::to_string_pretty(&submission_schema(kind))?);
        return Ok(ExitCode::SUCCESS);
    }

    let production = if cli.check_production {
        let (library, load) = ContentLibrary::load_dir(&cli.data_dir);
        for (kind, err) in &load.failed {
            eprintln!("WARNING: could not load production {} table: {}", kind, err);
        }
        Some(library)
    } else {
        None
    };

    let mut reports: Vec<ValidationReport> = Vec::new();
    let mut unreadable = 0;

    for path in &cli.files {
        let mut submission = match Submission::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                unreadable += 1;
                continue;
            }
        };

        if cli.fix {
            let fixes = fix_submission(&mut submission);
            if !fixes.is_empty() {
                for fix in &fixes {
                    println!("  fixed {}", fix);
                }
                submission
                    .save(path)
                    .with_context(|| format!("rewriting {}", path.display()))?;
            }
        }

        let report = validate_submission(&submission, production.as_ref())
            .with_source(path.display().to_string());
        println!("{}: {}", path.display(), report.summary());
        for issue in &report.issues {
            println!("  {}", issue);
        }
        reports.push(report);
    }

    if let Some(report_path) = &cli.report {
        std::fs::write(report_path, combined_markdown(&reports))
            .with_context(|| format!("writing report to {}", report_path.display()))?;
        println!("Report written to {}", report_path.display());
    }

    let failed = unreadable + reports.iter().filter(|r| r.has_errors()).count();
    if failed > 0 {
        println!("\nFAILED: {} of {} submission(s) have errors", failed, cli.files.len());
        Ok(ExitCode::FAILURE)
    } else {
        println!("\nPASSED: {} submission(s) valid", cli.files.len());
        Ok(ExitCode::SUCCESS)
    }
}
