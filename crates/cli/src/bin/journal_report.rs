use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cli::{fmt_pct, open_repository, print_json, FilterArgs};
use dashboard_engine::filters::{delete_view, save_view};
use dashboard_engine::rolls::{apply_auto_rolls, suggest_rolls, AutoRollRules};
use dashboard_engine::series::monthly_pl;
use dashboard_engine::{apply_filters, compute_kpis, expiry_alerts, group_positions, strategy_table, GroupMode};
use models::Position;

#[derive(Parser, Debug)]
#[command(name = "journal_report", about = "KPIs, alerts and roll suggestions for the options journal")]
struct Args {
    /// Journal database (directory or .json file); defaults to settings.database_path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    filters: FilterArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Net P&L, win rate, annualized ROI and DTE distribution
    Kpis,
    /// Per-strategy counts, P&L and ROI
    Strategies,
    /// Open legs expiring within the alert window
    Alerts {
        /// Overrides the stored alert lead time
        #[arg(long)]
        lead_hours: Option<u32>,
    },
    /// Short legs near expiry that would be rolled out
    Rolls {
        #[arg(long, default_value_t = 7)]
        dte: i64,

        #[arg(long, default_value_t = 14)]
        add_days: u64,

        #[arg(long, default_value_t = 10.0)]
        min_credit: f64,

        /// Roll the suggested legs and write the database
        #[arg(long)]
        apply: bool,
    },
    /// Positions bucketed by ticker or strategy
    Groups {
        #[arg(long, default_value = "ticker")]
        by: String,
    },
    /// Realized P&L per close month
    Monthly,
    /// Store the current filter flags under a name
    SaveView { name: String },
    DeleteView { name: String },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = settings_loader::load_settings_or_default(args.settings.as_ref());
    logger::init_logging(&settings.log_level, logger::LogFormat::Pretty);

    let repo = open_repository(args.db, &settings);
    let mut state = repo.load_state();
    let now = Local::now().naive_local();
    let today = now.date();

    tracing::info!(
        "Reading {} ({} positions)",
        repo.path().display(),
        state.positions.len()
    );

    let filter = args.filters.to_filter(&state)?;
    let filtered: Vec<Position> = apply_filters(&state.positions, &filter)
        .into_iter()
        .cloned()
        .collect();
    if !args.filters.is_empty() {
        println!("🔎 {} of {} positions match", filtered.len(), state.positions.len());
    }

    match args.command {
        Command::Kpis => {
            let k = compute_kpis(&filtered, today);
            if args.json {
                return print_json(&k);
            }
            println!("📊 KPIs:");
            println!("  Net P&L:         {:.2}", k.net_pl);
            println!("  Closed:          {}", k.closed_positions);
            println!("  Win rate:        {}", fmt_pct(k.win_rate_pct));
            println!("  Avg annualized:  {}", fmt_pct(k.avg_annualized_pct));
            println!(
                "  DTE avg/median:  {} / {}",
                k.dte_avg.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string()),
                k.dte_median.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
            );
            println!("  Expiring soon:   {}", fmt_pct(k.dte_soon_pct));
        }
        Command::Strategies => {
            let rows = strategy_table(&filtered, today);
            if args.json {
                return print_json(&rows);
            }
            println!("📊 Strategies:");
            for r in rows {
                println!(
                    "  {:<20} {:>4}  P&L {:>10.2}  ROI {:>8}  Ann. {:>8}  Win {:>7}",
                    r.strategy,
                    r.count,
                    r.pl_sum,
                    fmt_pct(r.avg_roi_pct),
                    fmt_pct(r.avg_annualized_pct),
                    fmt_pct(r.win_rate_pct)
                );
            }
        }
        Command::Alerts { lead_hours } => {
            let lead = lead_hours.unwrap_or(state.alert_lead_hours);
            let alerts = expiry_alerts(&filtered, now, lead);
            if args.json {
                return print_json(&alerts);
            }
            if alerts.is_empty() {
                println!("✓ Nothing expires in the next {}h", lead);
            }
            for a in alerts {
                println!("⏰ {} ({:.1}h left)", a.message(), a.hours_left);
            }
        }
        Command::Rolls {
            dte,
            add_days,
            min_credit,
            apply,
        } => {
            let rules = AutoRollRules {
                dte_threshold: dte,
                add_days,
                min_credit_per_contract: min_credit,
            };
            if !apply {
                let suggestions = suggest_rolls(&filtered, &rules, today);
                if args.json {
                    return print_json(&suggestions);
                }
                if suggestions.is_empty() {
                    println!("✓ No legs to roll");
                }
                for s in suggestions {
                    println!(
                        "🔁 {} {} {} {} {} ({} DTE) -> {} (+{:.2})",
                        s.position_title, s.ticker, s.option_type, s.strike, s.expiry, s.dte, s.new_expiry, s.estimated_credit
                    );
                }
                return Ok(());
            }

            let mut rolled = filtered;
            let report = apply_auto_rolls(&mut rolled, &rules, today)?;
            for pos in rolled {
                if let Some(slot) = state.positions.iter_mut().find(|p| p.id == pos.id) {
                    *slot = pos;
                }
            }
            repo.save_state(&state)
                .with_context(|| format!("Failed to write {}", repo.path().display()))?;
            println!("✓ Rolled {} of {} suggested legs", report.applied, report.suggested);
            println!("✅ Database written to: {}", repo.path().display());
        }
        Command::Groups { by } => {
            let mode: GroupMode = by.parse().map_err(anyhow::Error::msg)?;
            let groups = group_positions(&filtered, mode, today);
            if args.json {
                return print_json(&groups);
            }
            for g in groups {
                println!(
                    "  {:<20} {:>3} positions ({} open)  P&L {:>10.2}  avg DTE {}",
                    g.key,
                    g.count,
                    g.open,
                    g.pl,
                    g.avg_dte.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Command::Monthly => {
            let months = monthly_pl(&filtered);
            if args.json {
                return print_json(&months);
            }
            for m in months {
                println!("  {}  {:>10.2}", m.label, m.value);
            }
        }
        Command::SaveView { name } => {
            save_view(&mut state, &name, filter);
            repo.save_state(&state)?;
            println!("✓ Saved view '{}'", name.trim());
        }
        Command::DeleteView { name } => {
            if delete_view(&mut state, &name) {
                repo.save_state(&state)?;
                println!("✓ Deleted view '{}'", name.trim());
            } else {
                println!("❌ No view named '{}'", name.trim());
            }
        }
    }

    Ok(())
}
