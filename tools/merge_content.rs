/// Content merger: appends validated submissions to the production tables.
///
/// Usage: merge_content <files...> [--dry-run] [--data-dir <dir>]

use anyhow::{Context, Result};
use clap::Parser;
use loreweaver::validate::{merge_submission, validate_submission, Submission, ValidateError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "merge_content")]
#[command(about = "Merge LoreWeaver content submissions into the data tables", long_about = None)]
#[command(version)]
struct Cli {
    /// Submission files
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Show what would be merged without writing anything
    #[arg(long)]
    dry_run: bool,

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
    let mut rejected = 0;

    for path in &cli.files {
        let submission =
            Submission::load(path).with_context(|| format!("loading {}", path.display()))?;

        match merge_submission(&submission, &cli.data_dir, cli.dry_run) {
            Ok(outcome) => {
                let verb = if cli.dry_run { "Would add" } else { "Added" };
                println!(
                    "{}: {} {} {} entries to {}",
                    path.display(),
                    verb,
                    outcome.added.len(),
                    outcome.kind,
                    outcome.table.display()
                );
                for key in &outcome.added {
                    println!("  + {}", key);
                }
                for key in &outcome.skipped {
                    println!("  = {} (already present, skipped)", key);
                }
            }
            Err(ValidateError::Rejected(count)) => {
                rejected += 1;
                println!("{}: rejected with {} error(s)", path.display(), count);
                let report = validate_submission(&submission, None);
                for issue in report.errors() {
                    println!("  {}", issue);
                }
            }
            Err(e) => return Err(e).with_context(|| format!("merging {}", path.display())),
        }
    }

    if rejected > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
