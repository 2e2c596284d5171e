use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use models::{Position, PositionStatus};
use regex::Regex;
use serde::Serialize;

use crate::kpis::mean;
use crate::metrics::{dte, position_pl};
use crate::{round1, round2};

pub const NO_TICKER: &str = "(SIN_TICKER)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupMode {
    #[default]
    Ticker,
    Strategy,
}

impl FromStr for GroupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ticker" => Ok(GroupMode::Ticker),
            "strategy" => Ok(GroupMode::Strategy),
            other => Err(format!("unknown grouping mode '{}'", other)),
        }
    }
}

fn title_ticker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z.]{1,6})\b").expect("valid title ticker regex"))
}

/// First leg ticker, else a leading ticker-like word of the title.
pub fn first_ticker(pos: &Position) -> String {
    if let Some(t) = pos.legs.iter().map(|l| l.ticker.trim()).find(|t| !t.is_empty()) {
        return t.to_uppercase();
    }
    let title = pos.title.to_uppercase();
    title_ticker_re()
        .captures(&title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NO_TICKER.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
    pub open: usize,
    pub pl: f64,
    pub avg_dte: Option<f64>,
    pub position_ids: Vec<String>,
}

/// Buckets positions by ticker or strategy, in order of first appearance.
pub fn group_positions(positions: &[Position], mode: GroupMode, today: NaiveDate) -> Vec<GroupSummary> {
    let mut buckets: Vec<(String, Vec<&Position>)> = Vec::new();
    for p in positions {
        let key = match mode {
            GroupMode::Ticker => first_ticker(p),
            GroupMode::Strategy => p.strategy_label().to_string(),
        };
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, list)) => list.push(p),
            None => buckets.push((key, vec![p])),
        }
    }

    buckets
        .into_iter()
        .map(|(key, list)| {
            let pl: f64 = list.iter().map(|p| position_pl(p)).filter(|x| x.is_finite()).sum();
            let dtes: Vec<f64> = list
                .iter()
                .flat_map(|p| p.legs.iter())
                .filter_map(|l| dte(&l.expiry, today))
                .map(|d| d as f64)
                .collect();
            GroupSummary {
                count: list.len(),
                open: list.iter().filter(|p| p.status == PositionStatus::Open).count(),
                pl: round2(pl),
                avg_dte: mean(&dtes).map(round1),
                position_ids: list.iter().map(|p| p.id.clone()).collect(),
                key,
            }
        })
        .collect()
}
