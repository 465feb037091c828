use clap::{Parser, Subcommand};
use regroup_core::config::DisplayConfig;
use regroup_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "regroup")]
#[command(about = "Grouped, set-aware workout reordering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild and print the working list of a saved workout
    Show {
        /// Exercise catalog (JSON array)
        #[arg(long)]
        catalog: PathBuf,

        /// Saved workout or legacy snapshot
        #[arg(long)]
        workout: PathBuf,
    },

    /// Replay a script of edits against a workout and save the result
    Apply {
        /// Exercise catalog (JSON array)
        #[arg(long)]
        catalog: PathBuf,

        /// Saved workout or legacy snapshot
        #[arg(long)]
        workout: PathBuf,

        /// JSON array of session commands
        #[arg(long)]
        script: PathBuf,

        /// Where to save (defaults to <data-dir>/workout.json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Dry run - show the result without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate an exercise catalog
    Check {
        /// Exercise catalog (JSON array)
        #[arg(long)]
        catalog: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    regroup_core::logging::init_with_level(&config.logging.level);

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Show { catalog, workout } => cmd_show(&catalog, &workout, &config),
        Commands::Apply {
            catalog,
            workout,
            script,
            output,
            dry_run,
        } => {
            let output = output.unwrap_or_else(|| data_dir.join("workout.json"));
            cmd_apply(&catalog, &workout, &script, &output, dry_run, &config)
        }
        Commands::Check { catalog } => cmd_check(&catalog),
    }
}

fn cmd_show(catalog_path: &Path, workout_path: &Path, config: &Config) -> Result<()> {
    let catalog = ExerciseCatalog::load_from(catalog_path)?;
    let snapshot = load_snapshot(workout_path)?;

    let source = ReconstructionSource::select(&snapshot);
    let session = EditingSession::open(&snapshot, &catalog);

    println!("Rebuilt from {:?} shape", source);
    print_list(session.list(), &config.display);
    Ok(())
}

fn cmd_apply(
    catalog_path: &Path,
    workout_path: &Path,
    script_path: &Path,
    output: &Path,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let catalog = ExerciseCatalog::load_from(catalog_path)?;
    let snapshot = load_snapshot(workout_path)?;
    let commands = load_script(script_path)?;

    let mut session = EditingSession::open(&snapshot, &catalog);

    let mut applied = 0;
    for command in &commands {
        if session.apply(command) {
            applied += 1;
        } else {
            println!("  skipped: {:?}", command);
        }
    }

    if session.active_drag().is_some() {
        tracing::warn!("Script ended mid-drag, the drag is abandoned");
    }
    if session.selection().is_active() {
        tracing::warn!("Script ended in selection mode, the pending group is dropped");
    }

    println!("✓ Applied {} of {} commands", applied, commands.len());
    print_list(session.list(), &config.display);

    if dry_run {
        println!("\n[Dry run - not saving]");
        session.discard();
        return Ok(());
    }

    let mut sink = JsonFileSink::new(output);
    let saved = session.save(&mut sink)?;

    println!(
        "\n✓ Saved {} sets in {} groups",
        saved.flat_order.len(),
        saved.groups.len()
    );
    println!("  Workout: {}", sink.path().display());
    Ok(())
}

fn cmd_check(catalog_path: &Path) -> Result<()> {
    let catalog = ExerciseCatalog::load_from(catalog_path)?;
    println!("✓ Catalog OK: {} exercises", catalog.len());
    Ok(())
}

fn load_script(path: &Path) -> Result<Vec<SessionCommand>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::Input(format!("Invalid script {:?}: {}", path, e)))
}

fn print_list(list: &WorkingList, display: &DisplayConfig) {
    println!();
    if list.is_empty() {
        println!("  (empty workout)");
    }

    for entry in list.entries() {
        match entry {
            ListEntry::Header(header) => {
                println!(
                    "  ┌ {} · {}",
                    display.group_title(header.kind, header.number),
                    header.summary.join(", ")
                );
            }
            ListEntry::Item(item) => {
                let rail = if item.is_standalone() { "" } else { "│ " };
                let sets: Vec<String> = item
                    .set_groups
                    .iter()
                    .map(|sg| {
                        if sg.special {
                            format!("{}*", sg.count)
                        } else {
                            sg.count.to_string()
                        }
                    })
                    .collect();
                println!(
                    "  {}{} [{}] ×{} ({})",
                    rail,
                    item.exercise.name,
                    item.id,
                    item.count,
                    sets.join(" + ")
                );
            }
            ListEntry::Footer(_) => println!("  └"),
        }
    }
    println!();
}
