//! Per-position metrics: capital at risk, realized P&L, ROI and annualized ROI.

use chrono::NaiveDate;
use models::{Action, OptionType, Position, PositionStatus};
use serde::Serialize;

pub const CASH_SECURED_PUT: &str = "Cash Secured Put";
pub const COVERED_CALL: &str = "Covered Call";

/// Days used for annualization when the position has no open date.
const DEFAULT_HOLDING_DAYS: i64 = 30;

pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Whole days from `a` to `b`, floored at zero.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().max(0)
}

/// Days to expiry; `None` for blank or unparseable expiries.
pub fn dte(expiry: &str, today: NaiveDate) -> Option<i64> {
    parse_iso(expiry).map(|exp| days_between(today, exp))
}

/// Strategy-dependent maximum plausible loss. Never negative.
pub fn capital_at_risk(pos: &Position) -> f64 {
    let mut credit = 0.0;
    let mut debit = 0.0;
    let mut spread_loss = 0.0;
    let mut has_spread = false;

    for leg in &pos.legs {
        let c = leg.contracts_value();
        let notional = leg.premium_value() * c * 100.0;
        match leg.action {
            Action::Sell => credit += notional,
            Action::Buy => debit += notional,
        }
        if let Some(width) = leg.width {
            has_spread = true;
            spread_loss += width * 100.0 * c;
        }
    }

    if has_spread {
        return (spread_loss - credit + debit).max(0.0);
    }

    match pos.strategy.trim() {
        CASH_SECURED_PUT => {
            let total_strike: f64 = pos
                .legs
                .iter()
                .filter(|l| l.option_type == OptionType::Put)
                .map(|l| l.strike_value() * 100.0 * l.contracts_value())
                .sum();
            (total_strike - credit + debit).max(0.0)
        }
        COVERED_CALL => {
            let basis = pos.cost_basis_value();
            let exposure = if basis > 0.0 {
                let contracts: f64 = pos.legs.iter().map(|l| l.contracts_value()).sum();
                basis * 100.0 * contracts
            } else {
                pos.legs
                    .iter()
                    .map(|l| l.strike_value() * 100.0 * l.contracts_value())
                    .sum()
            };
            (exposure - credit + debit).max(0.0)
        }
        _ => (credit - debit).abs(),
    }
}

/// Realized P&L net of every leg's fees. Unsettled legs only count once the
/// position itself is closed.
pub fn position_pl(pos: &Position) -> f64 {
    let closed = pos.status == PositionStatus::Closed;
    let mut pl = 0.0;
    let mut fees = 0.0;
    for leg in &pos.legs {
        if closed || leg.status.is_settled() {
            pl += leg.pl_value();
        }
        fees += leg.fees_value();
    }
    pl - fees
}

/// Days the position has been (or was) held, for annualization.
pub fn holding_days(pos: &Position, today: NaiveDate) -> i64 {
    let Some(open) = parse_iso(&pos.open_date) else {
        return DEFAULT_HOLDING_DAYS;
    };
    let close = parse_iso(&pos.close_date)
        .or_else(|| {
            pos.legs
                .iter()
                .filter_map(|l| parse_iso(&l.close_date))
                .max()
        })
        .unwrap_or(today);
    days_between(open, close).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RoiMetrics {
    pub roi: Option<f64>,
    pub annualized: Option<f64>,
}

pub fn annualize(roi: f64, days: i64) -> f64 {
    roi * 365.0 / days.max(1) as f64
}

pub fn position_roi(pos: &Position, today: NaiveDate) -> RoiMetrics {
    let car = capital_at_risk(pos);
    if !car.is_finite() || car <= 0.0 {
        return RoiMetrics::default();
    }
    let roi = position_pl(pos) / car;
    RoiMetrics {
        roi: Some(roi),
        annualized: Some(annualize(roi, holding_days(pos, today))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionMetrics {
    pub capital_at_risk: f64,
    pub pl: f64,
    pub roi: Option<f64>,
    pub annualized_roi: Option<f64>,
}

pub fn position_metrics(pos: &Position, today: NaiveDate) -> PositionMetrics {
    let roi = position_roi(pos, today);
    PositionMetrics {
        capital_at_risk: capital_at_risk(pos),
        pl: position_pl(pos),
        roi: roi.roi,
        annualized_roi: roi.annualized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Leg, LegStatus};

    fn day(s: &str) -> NaiveDate {
        parse_iso(s).unwrap()
    }

    fn leg(option_type: OptionType, action: Action, strike: &str, premium: &str) -> Leg {
        Leg {
            id: format!("{}{}", strike, action),
            ticker: "AAPL".to_string(),
            option_type,
            action,
            strike: strike.to_string(),
            expiry: "2025-10-17".to_string(),
            premium: premium.to_string(),
            contracts: "1".to_string(),
            fees: "1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_leg_position() {
        let pos = Position::default();
        assert_eq!(capital_at_risk(&pos), 0.0);
        assert_eq!(position_roi(&pos, day("2025-09-01")), RoiMetrics::default());
    }

    #[test]
    fn test_spread_car_uses_width() {
        let mut pos = Position {
            legs: vec![
                leg(OptionType::Put, Action::Sell, "180", "2"),
                leg(OptionType::Put, Action::Buy, "175", "0.5"),
            ],
            ..Default::default()
        };
        pos.legs[0].width = Some(5.0);
        pos.legs[1].width = Some(5.0);
        // 2 * 5 * 100 - 200 + 50
        assert_eq!(capital_at_risk(&pos), 850.0);
    }

    #[test]
    fn test_cash_secured_put_car() {
        let pos = Position {
            strategy: CASH_SECURED_PUT.to_string(),
            legs: vec![leg(OptionType::Put, Action::Sell, "50", "1.5")],
            ..Default::default()
        };
        assert_eq!(capital_at_risk(&pos), 4850.0);
    }

    #[test]
    fn test_covered_call_car_prefers_basis() {
        let mut pos = Position {
            strategy: COVERED_CALL.to_string(),
            cost_basis: "40".to_string(),
            legs: vec![leg(OptionType::Call, Action::Sell, "45", "1")],
            ..Default::default()
        };
        assert_eq!(capital_at_risk(&pos), 3900.0);

        pos.cost_basis.clear();
        assert_eq!(capital_at_risk(&pos), 4400.0);
    }

    #[test]
    fn test_default_car_is_net_premium() {
        let pos = Position {
            legs: vec![
                leg(OptionType::Call, Action::Buy, "190", "3"),
                leg(OptionType::Put, Action::Sell, "150", "1"),
            ],
            ..Default::default()
        };
        assert_eq!(capital_at_risk(&pos), 200.0);
    }

    #[test]
    fn test_pl_counts_settled_legs_and_all_fees() {
        let mut pos = Position {
            legs: vec![
                leg(OptionType::Put, Action::Sell, "180", "2"),
                leg(OptionType::Put, Action::Buy, "175", "0.5"),
            ],
            ..Default::default()
        };
        pos.legs[0].status = LegStatus::Closed;
        pos.legs[0].pl = "150".to_string();
        pos.legs[1].pl = "-40".to_string();
        assert_eq!(position_pl(&pos), 148.0);

        pos.status = PositionStatus::Closed;
        assert_eq!(position_pl(&pos), 108.0);
    }

    #[test]
    fn test_roi_and_annualization() {
        let mut pos = Position {
            open_date: "2025-09-01".to_string(),
            close_date: "2025-09-11".to_string(),
            status: PositionStatus::Closed,
            legs: vec![leg(OptionType::Put, Action::Sell, "180", "2")],
            ..Default::default()
        };
        pos.legs[0].pl = "101".to_string();
        pos.legs[0].fees = "1".to_string();
        // car 200, pl 100
        let m = position_roi(&pos, day("2025-12-01"));
        assert_eq!(m.roi, Some(0.5));
        assert_eq!(m.annualized, Some(0.5 * 365.0 / 10.0));
    }

    #[test]
    fn test_holding_days_fallbacks() {
        let mut pos = Position::default();
        assert_eq!(holding_days(&pos, day("2025-09-01")), 30);

        pos.open_date = "2025-09-01".to_string();
        assert_eq!(holding_days(&pos, day("2025-09-01")), 1);
        assert_eq!(holding_days(&pos, day("2025-09-21")), 20);

        pos.legs.push(Leg {
            close_date: "2025-09-06".to_string(),
            ..Default::default()
        });
        assert_eq!(holding_days(&pos, day("2025-09-21")), 5);
    }

    #[test]
    fn test_dte() {
        let today = day("2025-10-10");
        assert_eq!(dte("2025-10-17", today), Some(7));
        assert_eq!(dte("2025-10-01", today), Some(0));
        assert_eq!(dte("", today), None);
        assert_eq!(dte("soon", today), None);
    }
}
