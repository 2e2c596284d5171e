pub mod alerts;
pub mod export;
pub mod filters;
pub mod grouping;
pub mod kpis;
pub mod metrics;
pub mod rolls;
pub mod series;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use models::Position;
use serde::Serialize;
use std::{fs, path::Path};

pub use crate::alerts::{expiry_alerts, ExpiryAlert};
pub use crate::filters::{apply_filters, matches_filter};
pub use crate::grouping::{group_positions, GroupMode, GroupSummary};
pub use crate::kpis::{compute_kpis, strategy_table, KpiSummary, StrategyRow};
pub use crate::metrics::{capital_at_risk, position_metrics, position_pl, position_roi};

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
pub struct DashboardMetadata {
    pub generated_at: String,
    pub position_count: usize,
    pub alert_lead_hours: u32,
}

#[derive(Debug, Serialize)]
pub struct DashboardOutput {
    pub metadata: DashboardMetadata,
    pub kpis: KpiSummary,
    pub strategies: Vec<StrategyRow>,
    pub by_ticker: Vec<GroupSummary>,
    pub monthly_pl: Vec<series::LabeledValue>,
    pub pl_by_ticker: Vec<series::LabeledValue>,
    pub premium_vs_fees: series::PremiumVsFees,
    pub roi_by_strategy: Vec<series::LabeledValue>,
    pub alerts: Vec<ExpiryAlert>,
}

/// Builds every report over `positions` as of `now`.
pub fn generate_dashboard_at(positions: &[Position], now: NaiveDateTime, alert_lead_hours: u32) -> DashboardOutput {
    let today: NaiveDate = now.date();
    DashboardOutput {
        metadata: DashboardMetadata {
            generated_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            position_count: positions.len(),
            alert_lead_hours,
        },
        kpis: compute_kpis(positions, today),
        strategies: strategy_table(positions, today),
        by_ticker: group_positions(positions, GroupMode::Ticker, today),
        monthly_pl: series::monthly_pl(positions),
        pl_by_ticker: series::pl_by_ticker(positions),
        premium_vs_fees: series::premium_vs_fees(positions),
        roi_by_strategy: series::roi_by_strategy(positions, today),
        alerts: expiry_alerts(positions, now, alert_lead_hours),
    }
}

pub fn generate_dashboard(positions: &[Position], alert_lead_hours: u32) -> DashboardOutput {
    generate_dashboard_at(positions, Local::now().naive_local(), alert_lead_hours)
}

pub fn write_dashboard_json(output: &DashboardOutput, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating output directory {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(output)?;
    fs::write(out_path, json).with_context(|| format!("Writing {}", out_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Action, Leg, OptionType};

    #[test]
    fn test_dashboard_over_small_book() {
        let now = NaiveDateTime::parse_from_str("2025-10-10 09:00", "%Y-%m-%d %H:%M").unwrap();
        let positions = vec![Position {
            id: "p".to_string(),
            title: "SPY".to_string(),
            open_date: "2025-10-01".to_string(),
            legs: vec![Leg {
                id: "l".to_string(),
                ticker: "SPY".to_string(),
                option_type: OptionType::Put,
                action: Action::Sell,
                strike: "500".to_string(),
                expiry: "2025-10-11".to_string(),
                premium: "1".to_string(),
                contracts: "1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }];

        let out = generate_dashboard_at(&positions, now, 36);
        assert_eq!(out.metadata.position_count, 1);
        assert_eq!(out.strategies.len(), 1);
        assert_eq!(out.by_ticker[0].key, "SPY");
        assert_eq!(out.alerts.len(), 1);
        assert_eq!(out.premium_vs_fees.net_credit, 100.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/dashboard.json");
        write_dashboard_json(&out, &path).unwrap();
        let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["kpis"]["dte_avg"], 1.0);
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round1(14.333), 14.3);
    }
}
