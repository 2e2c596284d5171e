use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf};

use cli::{open_repository, FilterArgs};
use dashboard_engine::apply_filters;
use dashboard_engine::export::{export_backup_json, export_csv_string};
use models::Position;
use utils::{merge_positions_with_deduplication, parse_backup};

#[derive(Parser, Debug)]
#[command(name = "journal_export", about = "Export the options journal to CSV or JSON, or restore a backup")]
struct Args {
    /// Journal database (directory or .json file); defaults to settings.database_path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One row per leg; filter flags limit the exported positions
    Csv {
        /// Defaults to positions.csv, or positions_filtered.csv when filtering
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Full JSON backup of every position
    Backup {
        #[arg(short, long, default_value = "backup_positions.json")]
        output: PathBuf,
    },
    /// Prepend the positions of a backup, skipping ids already present
    Restore {
        input: PathBuf,

        /// Report what would be restored without writing
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = settings_loader::load_settings_or_default(args.settings.as_ref());
    logger::init_logging(&settings.log_level, logger::LogFormat::Pretty);

    let repo = open_repository(args.db, &settings);
    println!("📖 Reading database from: {}", repo.path().display());
    let mut state = repo.load_state();

    match args.command {
        Command::Csv { output, filters } => {
            let filter = filters.to_filter(&state)?;
            let selected: Vec<Position> = apply_filters(&state.positions, &filter)
                .into_iter()
                .cloned()
                .collect();
            let output = output.unwrap_or_else(|| {
                PathBuf::from(if filters.is_empty() {
                    "positions.csv"
                } else {
                    "positions_filtered.csv"
                })
            });
            let csv = export_csv_string(&selected, Local::now().date_naive())?;
            fs::write(&output, csv).with_context(|| format!("Failed to write {}", output.display()))?;
            println!("✓ Exported {} positions", selected.len());
            println!("✅ CSV written to: {}", output.display());
        }
        Command::Backup { output } => {
            let json = export_backup_json(&state.positions)?;
            fs::write(&output, json).with_context(|| format!("Failed to write {}", output.display()))?;
            println!("✓ Backed up {} positions", state.positions.len());
            println!("✅ Backup written to: {}", output.display());
        }
        Command::Restore { input, dry_run } => {
            let contents = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read backup {}", input.display()))?;
            let restored = parse_backup(&contents)
                .with_context(|| format!("Failed to parse backup {}", input.display()))?;
            println!("✓ Parsed {} positions from backup", restored.len());

            let current = std::mem::take(&mut state.positions);
            let (merged, stats) = merge_positions_with_deduplication(current, restored);

            println!("\n📊 Summary:");
            println!("✓ Added {} positions", stats.added);
            if stats.has_duplicates() {
                println!("  ({} already present, skipped)", stats.skipped);
            }
            println!("✓ Total after restore: {}", merged.len());

            if dry_run {
                println!("🧪 Dry run: nothing written");
                return Ok(());
            }
            state.positions = merged;
            repo.save_state(&state)
                .with_context(|| format!("Failed to write {}", repo.path().display()))?;
            println!("✅ Database written to: {}", repo.path().display());
        }
    }

    Ok(())
}
