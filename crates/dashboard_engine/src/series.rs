//! Chart-ready series: daily equity and committed capital, monthly and
//! per-ticker realized P&L, premium versus fees, ROI per strategy.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use models::{Action, Leg, Position};
use serde::Serialize;

use crate::metrics::{capital_at_risk, parse_iso, position_roi};
use crate::round2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeries {
    pub days: Vec<String>,
    /// Cumulative realized P&L net of fees.
    pub equity: Vec<f64>,
    /// Capital at risk of positions open on each day.
    pub capital: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PremiumVsFees {
    pub net_credit: f64,
    pub fees: f64,
}

fn realized_net(leg: &Leg) -> Option<f64> {
    if leg.close_date.is_empty() || !leg.status.is_settled() {
        return None;
    }
    Some(leg.pl_value() - leg.fees_value())
}

/// First open date to the latest close date (open positions count as
/// closing today).
pub fn date_bounds(positions: &[Position], today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = positions
        .iter()
        .filter_map(|p| parse_iso(&p.open_date))
        .min()
        .unwrap_or(today);
    let end = positions
        .iter()
        .map(|p| parse_iso(&p.close_date).unwrap_or(today))
        .max()
        .unwrap_or(today);
    (start, end)
}

pub fn time_series(positions: &[Position], today: NaiveDate) -> TimeSeries {
    let (start, end) = date_bounds(positions, today);
    let cars: Vec<f64> = positions.iter().map(capital_at_risk).collect();

    let mut series = TimeSeries::default();
    let mut cumulative = 0.0;
    for day in start.iter_days().take_while(|d| *d <= end) {
        let label = day.format("%Y-%m-%d").to_string();
        let mut capital = 0.0;
        let mut pnl = 0.0;
        for (p, car) in positions.iter().zip(&cars) {
            let opened = parse_iso(&p.open_date).map(|o| day >= o).unwrap_or(false);
            let closed = parse_iso(&p.close_date).map(|c| day > c).unwrap_or(false);
            if opened && !closed {
                capital += car;
            }
            for leg in &p.legs {
                if leg.close_date == label {
                    if let Some(net) = realized_net(leg) {
                        pnl += net;
                    }
                }
            }
        }
        cumulative += pnl;
        series.days.push(label);
        series.equity.push(round2(cumulative));
        series.capital.push(round2(capital));
    }
    series
}

fn sum_realized_by(positions: &[Position], key: impl Fn(&Leg) -> String) -> Vec<LabeledValue> {
    let mut map: BTreeMap<String, f64> = BTreeMap::new();
    for leg in positions.iter().flat_map(|p| p.legs.iter()) {
        if let Some(net) = realized_net(leg) {
            *map.entry(key(leg)).or_insert(0.0) += net;
        }
    }
    map.into_iter()
        .map(|(label, value)| LabeledValue {
            label,
            value: round2(value),
        })
        .collect()
}

/// Net realized P&L keyed by `YYYY-MM` of the close date.
pub fn monthly_pl(positions: &[Position]) -> Vec<LabeledValue> {
    sum_realized_by(positions, |l| l.close_date.chars().take(7).collect())
}

pub fn pl_by_ticker(positions: &[Position]) -> Vec<LabeledValue> {
    sum_realized_by(positions, |l| l.ticker.clone())
}

pub fn premium_vs_fees(positions: &[Position]) -> PremiumVsFees {
    let mut credit = 0.0;
    let mut fees = 0.0;
    for leg in positions.iter().flat_map(|p| p.legs.iter()) {
        let sign = match leg.action {
            Action::Sell => 1.0,
            Action::Buy => -1.0,
        };
        credit += sign * leg.premium_value() * leg.contracts_value() * 100.0;
        fees += leg.fees_value();
    }
    PremiumVsFees {
        net_credit: round2(credit),
        fees: round2(fees),
    }
}

/// Mean ROI (percent) per strategy label; positions without ROI are skipped.
pub fn roi_by_strategy(positions: &[Position], today: NaiveDate) -> Vec<LabeledValue> {
    let mut map: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for p in positions {
        if let Some(roi) = position_roi(p, today).roi.filter(|r| r.is_finite()) {
            map.entry(p.strategy_label().to_string())
                .or_default()
                .push(roi * 100.0);
        }
    }
    map.into_iter()
        .map(|(label, values)| LabeledValue {
            label,
            value: round2(values.iter().sum::<f64>() / values.len() as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{LegStatus, OptionType};

    fn closed_leg(ticker: &str, close: &str, pl: &str) -> Leg {
        Leg {
            id: format!("{}{}", ticker, close),
            ticker: ticker.to_string(),
            option_type: OptionType::Put,
            action: Action::Sell,
            premium: "1".to_string(),
            contracts: "1".to_string(),
            fees: "1".to_string(),
            status: LegStatus::Closed,
            close_date: close.to_string(),
            pl: pl.to_string(),
            ..Default::default()
        }
    }

    fn book() -> Vec<Position> {
        vec![
            Position {
                id: "a".to_string(),
                open_date: "2025-09-01".to_string(),
                close_date: "2025-09-02".to_string(),
                legs: vec![closed_leg("SPY", "2025-09-02", "51")],
                ..Default::default()
            },
            Position {
                id: "b".to_string(),
                open_date: "2025-09-02".to_string(),
                legs: vec![
                    closed_leg("QQQ", "2025-10-03", "21"),
                    Leg {
                        id: "open".to_string(),
                        ticker: "QQQ".to_string(),
                        action: Action::Buy,
                        premium: "0.5".to_string(),
                        contracts: "2".to_string(),
                        fees: "2".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_time_series_accumulates_realized_pl() {
        let today = parse_iso("2025-09-03").unwrap();
        let ts = time_series(&book(), today);
        assert_eq!(ts.days, vec!["2025-09-01", "2025-09-02", "2025-09-03"]);
        assert_eq!(ts.equity, vec![0.0, 50.0, 50.0]);
        // b: credit 100, debit 100 -> 0; a: 100
        assert_eq!(ts.capital, vec![100.0, 100.0, 0.0]);
    }

    #[test]
    fn test_empty_book_series_is_today() {
        let today = parse_iso("2025-09-03").unwrap();
        let ts = time_series(&[], today);
        assert_eq!(ts.days, vec!["2025-09-03"]);
    }

    #[test]
    fn test_monthly_and_ticker_pl() {
        let positions = book();
        let monthly = monthly_pl(&positions);
        assert_eq!(
            monthly,
            vec![
                LabeledValue { label: "2025-09".to_string(), value: 50.0 },
                LabeledValue { label: "2025-10".to_string(), value: 20.0 },
            ]
        );
        let by_ticker = pl_by_ticker(&positions);
        assert_eq!(by_ticker[0].label, "QQQ");
        assert_eq!(by_ticker[1].label, "SPY");
    }

    #[test]
    fn test_premium_vs_fees() {
        let pv = premium_vs_fees(&book());
        assert_eq!(pv.net_credit, 100.0);
        assert_eq!(pv.fees, 4.0);
    }

    #[test]
    fn test_roi_by_strategy_skips_positions_without_car() {
        let today = parse_iso("2025-09-03").unwrap();
        let rows = roi_by_strategy(&book(), today);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, models::DEFAULT_STRATEGY);
        // a: pl 50 over car 100
        assert_eq!(rows[0].value, 50.0);
    }
}
