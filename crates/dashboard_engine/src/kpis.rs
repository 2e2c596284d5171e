use chrono::NaiveDate;
use models::{Position, PositionStatus};
use serde::Serialize;

use crate::metrics::{dte, position_pl, position_roi};
use crate::{round1, round2};

/// Expiries at or under this many days count as "expiring soon".
pub const SOON_DTE: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub net_pl: f64,
    pub closed_positions: usize,
    /// Percent of closed positions with positive P&L.
    pub win_rate_pct: Option<f64>,
    /// Mean annualized ROI of closed positions, in percent.
    pub avg_annualized_pct: Option<f64>,
    pub dte_avg: Option<f64>,
    pub dte_median: Option<f64>,
    pub dte_soon_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyRow {
    pub strategy: String,
    pub count: usize,
    pub pl_sum: f64,
    pub avg_roi_pct: Option<f64>,
    pub avg_annualized_pct: Option<f64>,
    pub win_rate_pct: Option<f64>,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let m = sorted.len() / 2;
    Some(if sorted.len() % 2 == 1 {
        sorted[m]
    } else {
        (sorted[m - 1] + sorted[m]) / 2.0
    })
}

fn win_rate(closed: &[&Position]) -> Option<f64> {
    if closed.is_empty() {
        return None;
    }
    let wins = closed.iter().filter(|p| position_pl(p) > 0.0).count();
    Some(wins as f64 / closed.len() as f64 * 100.0)
}

pub fn compute_kpis(positions: &[Position], today: NaiveDate) -> KpiSummary {
    let net_pl: f64 = positions.iter().map(position_pl).sum();
    let closed: Vec<&Position> = positions
        .iter()
        .filter(|p| p.status == PositionStatus::Closed)
        .collect();

    let anns: Vec<f64> = closed
        .iter()
        .filter_map(|p| position_roi(p, today).annualized)
        .filter(|a| a.is_finite())
        .collect();

    let dtes: Vec<f64> = positions
        .iter()
        .flat_map(|p| p.legs.iter())
        .filter(|l| l.is_open())
        .filter_map(|l| dte(&l.expiry, today))
        .map(|d| d as f64)
        .collect();
    let soon = if dtes.is_empty() {
        None
    } else {
        let n = dtes.iter().filter(|d| **d <= SOON_DTE as f64).count();
        Some(n as f64 / dtes.len() as f64 * 100.0)
    };

    KpiSummary {
        net_pl: round2(net_pl),
        closed_positions: closed.len(),
        win_rate_pct: win_rate(&closed).map(round2),
        avg_annualized_pct: mean(&anns).map(|a| round2(a * 100.0)),
        dte_avg: mean(&dtes).map(round1),
        dte_median: median(&dtes).map(round1),
        dte_soon_pct: soon.map(round1),
    }
}

/// One row per strategy label, in order of first appearance.
pub fn strategy_table(positions: &[Position], today: NaiveDate) -> Vec<StrategyRow> {
    let mut order: Vec<&str> = Vec::new();
    for p in positions {
        let key = p.strategy_label();
        if !order.contains(&key) {
            order.push(key);
        }
    }

    order
        .into_iter()
        .map(|name| {
            let list: Vec<&Position> = positions
                .iter()
                .filter(|p| p.strategy_label() == name)
                .collect();
            let pl_sum: f64 = list.iter().map(|p| position_pl(p)).sum();
            let rois: Vec<_> = list.iter().map(|p| position_roi(p, today)).collect();
            let roi_values: Vec<f64> = rois.iter().filter_map(|r| r.roi).filter(|r| r.is_finite()).collect();
            let ann_values: Vec<f64> = rois
                .iter()
                .filter_map(|r| r.annualized)
                .filter(|a| a.is_finite())
                .collect();
            let closed: Vec<&Position> = list
                .iter()
                .copied()
                .filter(|p| p.status == PositionStatus::Closed)
                .collect();

            StrategyRow {
                strategy: name.to_string(),
                count: list.len(),
                pl_sum: round2(pl_sum),
                avg_roi_pct: mean(&roi_values).map(|r| round2(r * 100.0)),
                avg_annualized_pct: mean(&ann_values).map(|a| round2(a * 100.0)),
                win_rate_pct: win_rate(&closed).map(round2),
            }
        })
        .collect()
}
