//! Flags and helpers shared by the journal binaries.

use anyhow::{anyhow, Result};
use clap::Args;
use dashboard_engine::filters::find_view;
use models::{JournalSettings, JournalState, PositionFilter};
use serde::Serialize;
use std::path::PathBuf;
use utils::JsonFileRepository;

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Start from a saved view; the flags below override its fields
    #[arg(long)]
    pub view: Option<String>,

    /// Text searched in title, notes, tags and leg tickers/notes
    #[arg(long)]
    pub q: Option<String>,

    /// "all" or a position status (Open, Closed, Rolled, Assigned, Exercised)
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub tag: Option<String>,

    /// Earliest open date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Latest open date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

impl FilterArgs {
    pub fn is_empty(&self) -> bool {
        self.view.is_none()
            && self.q.is_none()
            && self.status.is_none()
            && self.tag.is_none()
            && self.from.is_none()
            && self.to.is_none()
    }

    pub fn to_filter(&self, state: &JournalState) -> Result<PositionFilter> {
        let mut filter = match &self.view {
            Some(name) => find_view(state, name)
                .map(|v| v.filters.clone())
                .ok_or_else(|| anyhow!("no saved view named '{}'", name))?,
            None => PositionFilter::default(),
        };
        if let Some(q) = &self.q {
            filter.q = q.clone();
        }
        if let Some(status) = &self.status {
            filter.status = status.clone();
        }
        if let Some(tag) = &self.tag {
            filter.tag = tag.clone();
        }
        if let Some(from) = &self.from {
            filter.from = from.clone();
        }
        if let Some(to) = &self.to {
            filter.to = to.clone();
        }
        Ok(filter)
    }
}

/// `--db` when given, else `settings.database_path`.
pub fn open_repository(db: Option<PathBuf>, settings: &JournalSettings) -> JsonFileRepository {
    let db = db.unwrap_or_else(|| PathBuf::from(&settings.database_path));
    JsonFileRepository::new(db)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `12.3%`, or `-` when there is nothing to average.
pub fn fmt_pct(v: Option<f64>) -> String {
    v.map(|x| format!("{:.1}%", x)).unwrap_or_else(|| "-".to_string())
}
