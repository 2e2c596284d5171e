use anyhow::Result;
use clap::Parser;
use std::{env, fs, path::PathBuf};

use options_csv::{
    import_paths, preview_csv, BatchSummary, CsvPreview, FileOutcome, ImportOptions, PresetSelection,
    SourceFile, PARSER_NAME,
};
use utils::{today_iso, JsonFileRepository, MemoryRepository, Repository};

#[derive(Parser, Debug)]
#[command(name = "options_csv_import", about = "Import broker options-trade CSV exports into the journal")]
struct Args {
    /// Journal database (directory or .json file); defaults to settings.database_path
    #[arg(long)]
    db: Option<PathBuf>,

    /// auto, ibkr, tos, tasty, tradestation, tradier, tradier_activity or tradier_statement
    #[arg(long)]
    preset: Option<String>,

    /// Run the import without writing the database
    #[arg(long)]
    dry_run: bool,

    /// Only show the detected mapping and the first rows of each file
    #[arg(long)]
    test: bool,

    /// With --test, print the previews as JSON
    #[arg(long)]
    json: bool,

    /// Settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// CSV files; the first .csv in the current directory when omitted
    files: Vec<PathBuf>,
}

fn find_csv_file() -> Option<PathBuf> {
    let current_dir = env::current_dir().ok()?;
    let entries = fs::read_dir(&current_dir).ok()?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv") {
            return Some(path);
        }
    }
    None
}

fn print_preview(name: &str, preview: &CsvPreview) {
    println!("\n🧪 {}", name);
    println!(
        "  Preset: {} (detected: {})",
        preview.requested,
        preview.detected.unwrap_or("none")
    );
    println!("  Delimiter: {:?}, {} data rows", preview.delimiter, preview.total_rows);
    println!("  Headers: {}", preview.headers.join(" | "));
    for col in &preview.mapping {
        println!("    {:<12} <- {}", col.field, col.header.as_deref().unwrap_or("-"));
    }
    if let Some(occ) = &preview.option_symbol {
        println!("    {:<12} <- {}", "occ symbol", occ);
    }
    if preview.is_importable() {
        println!("  ✓ All required columns found");
    } else {
        println!("  ❌ Missing columns: {}", preview.missing.join(", "));
    }
    for row in &preview.rows {
        let l = &row.leg;
        println!(
            "    {} | {} {} {} {} x{} @ {} | {} | fees {} | {}",
            row.title, l.ticker, l.option_type, l.strike, l.expiry, l.contracts, l.premium, row.action, l.fees, l.open_date
        );
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("\n📊 Summary:");
    for file in &summary.files {
        match &file.outcome {
            FileOutcome::Imported(done) => println!(
                "✓ {}: {} added, {} skipped (preset {})",
                file.name, done.added, done.skipped, done.preset
            ),
            FileOutcome::Failed(e) => println!("❌ {}: {}", file.name, e),
        }
    }
    let stats = summary.stats();
    println!("✓ Legs processed: {} added, {} skipped", stats.added, stats.skipped);
    if stats.has_duplicates() {
        println!("  ({} duplicate executions ignored)", stats.skipped);
    }
    if let Some(p) = &summary.used_preset {
        println!("✓ Preset used: {}", p);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = settings_loader::load_settings_or_default(args.settings.as_ref());
    logger::init_logging(&settings.log_level, logger::LogFormat::from_flag(args.json_logs));

    let files = if args.files.is_empty() {
        match find_csv_file() {
            Some(found) => vec![found],
            None => anyhow::bail!(
                "No CSV file found in current directory. Please provide at least one CSV file path."
            ),
        }
    } else {
        args.files
    };

    let selection: PresetSelection = args
        .preset
        .as_deref()
        .unwrap_or(&settings.default_preset)
        .parse()?;

    if args.test {
        let today = today_iso();
        let mut previews = Vec::new();
        for path in &files {
            let source = SourceFile::read(path)?;
            let preview = preview_csv(&source.text, selection, &today)?;
            if !args.json {
                println!("📖 Parsing {}", path.display());
                print_preview(&source.name, &preview);
            }
            previews.push(serde_json::json!({ "file": source.name, "preview": preview }));
        }
        if args.json {
            println!("{}", serde_json::to_string_pretty(&previews)?);
        }
        return Ok(());
    }

    let db = args
        .db
        .unwrap_or_else(|| PathBuf::from(&settings.database_path));
    let mut repo = JsonFileRepository::new(&db);
    let options = ImportOptions::from_settings(&settings);

    println!("📖 Reading database from: {}", repo.path().display());
    tracing::info!(
        "{}: importing {} file(s) with preset {}",
        PARSER_NAME,
        files.len(),
        selection.key()
    );

    if args.dry_run {
        let mut scratch = MemoryRepository::new(repo.load());
        let summary = import_paths(&mut scratch, &files, selection, options)?;
        print_summary(&summary);
        println!("🧪 Dry run: {} positions after import, nothing written", scratch.positions.len());
    } else {
        let summary = import_paths(&mut repo, &files, selection, options)?;
        print_summary(&summary);
        println!("✅ Database written to: {}", repo.path().display());
    }

    Ok(())
}
