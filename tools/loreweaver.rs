/// LoreWeaver: generate encounters, manage saved ones, and run an
/// interactive session with undo/redo.
///
/// Usage: loreweaver [--config <path>] [--data-dir <dir>] [--seed <n>] <command>
///
/// Shell commands:
///   generate | g            roll a new encounter
///   reroll location|npcs    re-roll one part of the current encounter
///   reveal                  show the full encounter (progressive reveal)
///   env <name|any>          set the environment
///   include <tag>           require a tag
///   exclude <tag>           forbid a tag
///   remove <tag>            drop a tag from the filters
///   clear                   clear all tag filters
///   undo / redo             step through history
///   save [label]            save the current encounter
///   export <format> [path]  print or write the current encounter
///   status                  show environment, filters and history
///   help                    list commands
///   quit                    exit

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use loreweaver::core::changelog::Changelog;
use loreweaver::core::config::LoreweaverConfig;
use loreweaver::core::events::{AppEvent, EventKind};
use loreweaver::core::export::{export_to_file, ExportFormat};
use loreweaver::core::generator::{EncounterGenerator, GeneratedEncounter, GenerationRequest};
use loreweaver::core::selection::TagFilter;
use loreweaver::core::session::Session;
use loreweaver::core::storage::{FileStore, Preferences, Theme};
use loreweaver::schema::environment::Environment;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loreweaver")]
#[command(about = "Random encounter, location and NPC generator for tabletop RPGs", long_about = None)]
#[command(version)]
struct Cli {
    /// RON config file (defaults to ./loreweaver.ron when present)
    #[arg(long, global = true, value_name = "PATH", env = "LOREWEAVER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the content tables
    #[arg(long, global = true, value_name = "DIR", env = "LOREWEAVER_DATA")]
    data_dir: Option<PathBuf>,

    /// Store file for preferences and saved encounters
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Fixed RNG seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one or more encounters and print them
    Generate(GenerateArgs),
    /// Generate an encounter and write it to a file
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file; the format is inferred from the extension unless --format is given
        #[arg(long, short)]
        output: PathBuf,
        #[arg(long, short)]
        format: Option<ExportFormat>,
    },
    /// Saved encounters
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Show release notes you have not seen yet
    WhatsNew,
    /// Show or change preferences
    Prefs {
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long)]
        progressive_reveal: Option<bool>,
    },
    /// Interactive session with undo/redo
    Shell,
}

#[derive(Args)]
struct FilterArgs {
    /// Environment to generate for
    #[arg(long = "env", value_name = "ENVIRONMENT")]
    environment: Option<Environment>,
    /// Only encounters carrying this tag (repeatable)
    #[arg(long, value_name = "TAG")]
    include: Vec<String>,
    /// Skip encounters carrying this tag (repeatable)
    #[arg(long, value_name = "TAG")]
    exclude: Vec<String>,
}

impl FilterArgs {
    fn request(&self, default_environment: Option<Environment>) -> GenerationRequest {
        let mut filter = TagFilter::new();
        for tag in &self.include {
            filter = filter.include(tag);
        }
        for tag in &self.exclude {
            filter = filter.exclude(tag);
        }
        GenerationRequest::new(self.environment.or(default_environment)).with_filter(filter)
    }
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    filters: FilterArgs,
    #[arg(long, short, default_value = "markdown")]
    format: ExportFormat,
    #[arg(long, short, default_value_t = 1)]
    count: usize,
    /// Also save each generated encounter
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum SavedAction {
    /// List saved encounters
    List,
    /// Print a saved encounter
    Show {
        /// Id or unambiguous id prefix
        id: String,
        #[arg(long, short, default_value = "markdown")]
        format: ExportFormat,
    },
    /// Delete a saved encounter
    Delete { id: String },
    /// Delete every saved encounter
    Clear,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("LOREWEAVER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = LoreweaverConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(path) = cli.store {
        config.storage_path = path;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    let mut prefs = Preferences::new(FileStore::open(&config.storage_path));

    match cli.command {
        Commands::Generate(args) => {
            let mut generator = build_generator(&config)?;
            let request = args.filters.request(config.default_environment);
            let encounters = generator.generate_variants(&request, args.count.max(1))?;
            if args.save {
                for encounter in &encounters {
                    let saved = prefs.save_encounter(encounter, None)?;
                    eprintln!("Saved {} ({})", saved.label, saved.id);
                }
            }
            print_encounters(&encounters, args.format)?;
        }
        Commands::Export {
            filters,
            output,
            format,
        } => {
            let format = match format {
                Some(format) => format,
                None => format_for_path(&output)?,
            };
            let mut generator = build_generator(&config)?;
            let encounter = generator.generate(&filters.request(config.default_environment))?;
            export_to_file(&encounter, format, &output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Exported '{}' to {}", encounter.title, output.display());
        }
        Commands::Saved { action } => handle_saved(&mut prefs, action)?,
        Commands::WhatsNew => {
            let path = config.data_dir.join("changelog.json");
            let changelog = Changelog::load(&path)?;
            let entries = changelog.whats_new(&mut prefs, env!("CARGO_PKG_VERSION"))?;
            if entries.is_empty() {
                println!("You're up to date.");
            }
            for entry in entries {
                println!("What's new in {}:", entry.version);
                for change in &entry.changes {
                    println!("  - {}", change);
                }
            }
        }
        Commands::Prefs {
            theme,
            progressive_reveal,
        } => {
            if let Some(theme) = theme {
                prefs.set_theme(theme)?;
            }
            if let Some(enabled) = progressive_reveal {
                prefs.set_progressive_reveal(enabled)?;
            }
            println!("theme: {}", prefs.theme());
            println!("progressive reveal: {}", prefs.progressive_reveal());
            println!("saved encounters: {}", prefs.saved_encounters().len());
        }
        Commands::Shell => {
            let generator = build_generator(&config)?;
            let mut session = Session::new(generator, config.history_limit);
            if let Some(env) = config.default_environment {
                session.set_environment(Some(env))?;
            }
            run_shell(&mut session, &mut prefs)?;
        }
    }

    Ok(())
}

fn build_generator(config: &LoreweaverConfig) -> Result<EncounterGenerator> {
    let generator = config.generator_builder().build()?;
    if generator.library().encounters.is_empty() {
        bail!("no encounters found in {}", config.data_dir.display());
    }
    Ok(generator)
}

fn format_for_path(path: &Path) -> Result<ExportFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("cannot infer a format for {}; pass --format", path.display()))?;
    Ok(ext.parse()?)
}

fn print_encounters(encounters: &[GeneratedEncounter], format: ExportFormat) -> Result<()> {
    if format == ExportFormat::Json && encounters.len() > 1 {
        println!("{}", serde_json::to_string_pretty(encounters)?);
        return Ok(());
    }
    let exporter = format.exporter();
    for (i, encounter) in encounters.iter().enumerate() {
        if i > 0 {
            println!("---\n");
        }
        print!("{}", exporter.export(encounter)?);
    }
    Ok(())
}

fn handle_saved(prefs: &mut Preferences<FileStore>, action: SavedAction) -> Result<()> {
    match action {
        SavedAction::List => {
            let saved = prefs.saved_encounters();
            if saved.is_empty() {
                println!("No saved encounters.");
            }
            for s in saved {
                println!(
                    "{}  {}  {}",
                    &s.id.to_string()[..8],
                    s.saved_at.format("%Y-%m-%d %H:%M"),
                    s.label
                );
            }
        }
        SavedAction::Show { id, format } => {
            let saved = prefs
                .find_saved(&id)
                .with_context(|| format!("no saved encounter matches '{}'", id))?;
            print!("{}", format.exporter().export(&saved.encounter)?);
        }
        SavedAction::Delete { id } => {
            let saved = prefs
                .find_saved(&id)
                .with_context(|| format!("no saved encounter matches '{}'", id))?;
            prefs.remove_saved(saved.id)?;
            println!("Deleted '{}'", saved.label);
        }
        SavedAction::Clear => {
            prefs.clear_saved()?;
            println!("Cleared saved encounters.");
        }
    }
    Ok(())
}

fn run_shell(session: &mut Session, prefs: &mut Preferences<FileStore>) -> Result<()> {
    session
        .bus_mut()
        .subscribe(Some(EventKind::EncounterSaved), |event| {
            if let AppEvent::EncounterSaved { id, title } = event {
                println!("Saved '{}' ({})", title, &id.to_string()[..8]);
            }
        });

    let reveal_gradually = prefs.progressive_reveal();
    println!(
        "Loaded {} encounters. Type 'help' for commands.\n",
        session.generator().library().encounters.len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("loreweaver> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            continue;
        };
        let arg = parts.get(1).copied();

        let outcome = match first.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
                Ok(())
            }
            "generate" | "g" => session
                .generate()
                .map(|enc| show_encounter(enc, reveal_gradually))
                .map_err(anyhow::Error::from),
            "reroll" => match arg {
                Some("location") => session
                    .reroll_location()
                    .map(|enc| show_encounter(enc, false))
                    .map_err(anyhow::Error::from),
                Some("npcs") | Some("npc") => session
                    .reroll_npcs()
                    .map(|enc| show_encounter(enc, false))
                    .map_err(anyhow::Error::from),
                _ => {
                    println!("Usage: reroll location|npcs");
                    Ok(())
                }
            },
            "reveal" | "show" => {
                match session.current() {
                    Some(enc) => show_encounter(enc, false),
                    None => println!("Nothing generated yet."),
                }
                Ok(())
            }
            "env" => match arg {
                None => {
                    println!("Usage: env <{}|any>", environment_names());
                    Ok(())
                }
                Some("any") => set_environment(session, None),
                Some(name) => match name.parse::<Environment>() {
                    Ok(env) => set_environment(session, Some(env)),
                    Err(e) => {
                        println!("{}", e);
                        Ok(())
                    }
                },
            },
            "include" | "exclude" | "remove" => match arg {
                None => {
                    println!("Usage: {} <tag>", first);
                    Ok(())
                }
                Some(tag) => {
                    let tag = tag.to_lowercase();
                    let changed = match first.to_lowercase().as_str() {
                        "include" => session.include_tag(&tag),
                        "exclude" => session.exclude_tag(&tag),
                        _ => session.remove_tag(&tag),
                    };
                    changed
                        .map(|_| print_filters(session.state().filter.describe()))
                        .map_err(anyhow::Error::from)
                }
            },
            "clear" => session
                .clear_filters()
                .map(|_| println!("Filters cleared."))
                .map_err(anyhow::Error::from),
            "undo" => session
                .undo()
                .map(|d| match d {
                    Some(d) => println!("Undid: {}", d),
                    None => println!("Nothing to undo."),
                })
                .map_err(anyhow::Error::from),
            "redo" => session
                .redo()
                .map(|d| match d {
                    Some(d) => println!("Redid: {}", d),
                    None => println!("Nothing to redo."),
                })
                .map_err(anyhow::Error::from),
            "save" => {
                let label = (parts.len() > 1).then(|| parts[1..].join(" "));
                session
                    .save_current(prefs, label.as_deref())
                    .map(|_| ())
                    .map_err(anyhow::Error::from)
            }
            "export" => export_current(session, arg, parts.get(2).copied()),
            "status" => {
                print_status(session);
                Ok(())
            }
            other => {
                println!("Unknown command: {}. Type 'help' for commands.", other);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("Error: {}", e);
        }
    }

    Ok(())
}

fn set_environment(session: &mut Session, env: Option<Environment>) -> Result<()> {
    session.set_environment(env)?;
    match env {
        Some(env) => println!("Environment: {}", env),
        None => println!("Environment: any"),
    }
    Ok(())
}

fn export_current(session: &Session, format: Option<&str>, path: Option<&str>) -> Result<()> {
    let encounter = session.current().context("nothing generated yet")?;
    let format: ExportFormat = format.unwrap_or("markdown").parse()?;
    match path {
        Some(path) => {
            export_to_file(encounter, format, Path::new(path))?;
            println!("Wrote {}", path);
        }
        None => print!("{}", format.exporter().export(encounter)?),
    }
    Ok(())
}

fn show_encounter(encounter: &GeneratedEncounter, summary_only: bool) {
    if summary_only {
        println!("\n{}\n\n{}\n\n(type 'reveal' for details)\n", encounter.title, encounter.description);
        return;
    }
    match ExportFormat::PlainText.exporter().export(encounter) {
        Ok(text) => println!("\n{}", text),
        Err(e) => println!("Error: {}", e),
    }
}

fn print_filters(described: String) {
    if described.is_empty() {
        println!("Filters: none");
    } else {
        println!("Filters: {}", described);
    }
}

fn print_status(session: &Session) {
    let state = session.state();
    println!(
        "Environment: {}",
        state.environment.map(|e| e.to_string()).unwrap_or_else(|| "any".to_string())
    );
    print_filters(state.filter.describe());
    let history = session.history();
    println!(
        "History: {} undo, {} redo (limit {})",
        history.undo_depth(),
        history.redo_depth(),
        history.limit()
    );
    if let Some(next) = history.peek_undo() {
        println!("  undo would revert: {}", next);
    }
}

fn environment_names() -> String {
    Environment::ALL
        .iter()
        .map(|e| e.name())
        .collect::<Vec<_>>()
        .join("|")
}

fn print_help() {
    println!("Commands:");
    println!("  generate | g            roll a new encounter");
    println!("  reroll location|npcs    re-roll part of the current encounter");
    println!("  reveal                  show the full current encounter");
    println!("  env <name|any>          set the environment");
    println!("  include <tag>           require a tag");
    println!("  exclude <tag>           forbid a tag");
    println!("  remove <tag>            drop a tag from the filters");
    println!("  clear                   clear all tag filters");
    println!("  undo / redo             step through history");
    println!("  save [label]            save the current encounter");
    println!("  export <format> [path]  print or write the current encounter");
    println!("  status                  show session state");
    println!("  quit                    exit");
}
