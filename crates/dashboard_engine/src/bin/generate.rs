use anyhow::{Context, Result};
use clap::Parser;
use dashboard_engine::{generate_dashboard, write_dashboard_json};
use std::path::PathBuf;
use utils::JsonFileRepository;

#[derive(Parser, Debug)]
#[command(name = "generate-dashboard", about = "Write journal KPIs and chart series as JSON")]
struct Args {
    /// Journal database (directory or .json file); defaults to settings.database_path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output path
    #[arg(long, default_value = "dashboard/dashboard.json")]
    out: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = settings_loader::load_settings_or_default(args.settings.as_ref());
    logger::init_logging(&settings.log_level, logger::LogFormat::Pretty);

    let db = args
        .db
        .unwrap_or_else(|| PathBuf::from(&settings.database_path));
    let repo = JsonFileRepository::new(&db);
    let state = repo.load_state();

    tracing::info!(
        "Generating dashboard from {} ({} positions) into {}",
        repo.path().display(),
        state.positions.len(),
        args.out.display()
    );

    let dashboard = generate_dashboard(&state.positions, state.alert_lead_hours);
    write_dashboard_json(&dashboard, &args.out).context("write dashboard.json")?;

    println!("Done. Generated at {}", dashboard.metadata.generated_at);
    Ok(())
}
