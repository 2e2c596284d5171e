use chrono::{Days, NaiveDate};
use models::{Action, Position};
use serde::Serialize;
use utils::positions::{auto_roll_leg, roll_net_credit, LegOpError, RollRequest};
use utils::refresh_combos;

use crate::metrics::{annualize, capital_at_risk, days_between, dte, parse_iso, position_pl};

/// Outcome of a hypothetical roll, before anything is changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollPreview {
    pub net_credit: f64,
    pub current_pl: f64,
    pub new_pl: f64,
    pub roi: Option<f64>,
    pub annualized_roi: Option<f64>,
}

pub fn preview_roll(
    pos: &Position,
    index: usize,
    req: &RollRequest,
    today: NaiveDate,
) -> Result<RollPreview, LegOpError> {
    let leg = pos.legs.get(index).ok_or(LegOpError::LegOutOfRange {
        index,
        len: pos.legs.len(),
    })?;

    let net_credit = roll_net_credit(leg, req);
    let current_pl = leg.pl_value();
    let new_pl = current_pl + net_credit;

    let car = capital_at_risk(pos);
    let start = parse_iso(&pos.open_date).unwrap_or(today);
    let expiry = if req.new_expiry.trim().is_empty() {
        &leg.expiry
    } else {
        &req.new_expiry
    };
    let days = parse_iso(expiry)
        .map(|e| days_between(start, e))
        .unwrap_or(0)
        .max(1);

    let roi = if car > 0.0 {
        Some((position_pl(pos) - current_pl + new_pl) / car)
    } else {
        None
    };

    Ok(RollPreview {
        net_credit,
        current_pl,
        new_pl,
        roi,
        annualized_roi: roi.map(|r| annualize(r, days)),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoRollRules {
    /// Legs at or under this DTE are rolled.
    pub dte_threshold: i64,
    pub add_days: u64,
    pub min_credit_per_contract: f64,
}

impl Default for AutoRollRules {
    fn default() -> Self {
        Self {
            dte_threshold: 7,
            add_days: 14,
            min_credit_per_contract: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollSuggestion {
    pub position_id: String,
    pub position_title: String,
    pub leg_index: usize,
    pub leg_id: String,
    pub ticker: String,
    pub option_type: String,
    pub strike: String,
    pub expiry: String,
    pub dte: i64,
    pub new_expiry: String,
    pub estimated_credit: f64,
}

/// Open short legs near expiry, rolled out at the same strike.
pub fn suggest_rolls(positions: &[Position], rules: &AutoRollRules, today: NaiveDate) -> Vec<RollSuggestion> {
    let mut out = Vec::new();
    for p in positions {
        for (i, leg) in p.legs.iter().enumerate() {
            if !leg.is_open() || leg.action != Action::Sell {
                continue;
            }
            let Some(d) = dte(&leg.expiry, today) else {
                continue;
            };
            if d > rules.dte_threshold {
                continue;
            }
            let Some(new_expiry) = parse_iso(&leg.expiry)
                .and_then(|e| e.checked_add_days(Days::new(rules.add_days)))
            else {
                continue;
            };
            out.push(RollSuggestion {
                position_id: p.id.clone(),
                position_title: p.title.clone(),
                leg_index: i,
                leg_id: leg.id.clone(),
                ticker: leg.ticker.clone(),
                option_type: leg.option_type.to_string(),
                strike: leg.strike.clone(),
                expiry: leg.expiry.clone(),
                dte: d,
                new_expiry: new_expiry.format("%Y-%m-%d").to_string(),
                estimated_credit: rules.min_credit_per_contract * leg.contracts_value(),
            });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AutoRollReport {
    pub suggested: usize,
    pub applied: usize,
}

/// Applies every suggestion from [`suggest_rolls`] and reruns spread detection
/// on all positions.
pub fn apply_auto_rolls(
    positions: &mut [Position],
    rules: &AutoRollRules,
    today: NaiveDate,
) -> Result<AutoRollReport, LegOpError> {
    let suggestions = suggest_rolls(positions, rules, today);
    let mut report = AutoRollReport {
        suggested: suggestions.len(),
        applied: 0,
    };

    for s in &suggestions {
        let Some(pos) = positions.iter_mut().find(|p| p.id == s.position_id) else {
            continue;
        };
        auto_roll_leg(pos, s.leg_index, &s.new_expiry, s.estimated_credit)?;
        report.applied += 1;
        tracing::info!(
            "Rolled {} {} {} to {} (+{:.2})",
            s.position_title,
            s.ticker,
            s.strike,
            s.new_expiry,
            s.estimated_credit
        );
    }

    for pos in positions.iter_mut() {
        refresh_combos(pos);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Leg, OptionType};

    fn today() -> NaiveDate {
        parse_iso("2025-10-10").unwrap()
    }

    fn short_put(expiry: &str, contracts: &str) -> Leg {
        Leg {
            id: format!("sp-{}", expiry),
            ticker: "SPY".to_string(),
            option_type: OptionType::Put,
            action: Action::Sell,
            strike: "500".to_string(),
            expiry: expiry.to_string(),
            premium: "2".to_string(),
            contracts: contracts.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_preview_roll_reports_hypothetical_roi() {
        let mut pos = Position {
            id: "p".to_string(),
            open_date: "2025-10-01".to_string(),
            legs: vec![short_put("2025-10-17", "1")],
            ..Default::default()
        };
        pos.legs[0].pl = "20".to_string();

        let req = RollRequest {
            new_expiry: "2025-10-31".to_string(),
            premium_per_contract: 1.0,
            fees: 0.0,
            ..Default::default()
        };
        let preview = preview_roll(&pos, 0, &req, today()).unwrap();
        assert_eq!(preview.net_credit, 100.0);
        assert_eq!(preview.new_pl, 120.0);
        // car 200, open leg pl not yet realized: (0 - 20 + 120) / 200
        assert_eq!(preview.roi, Some(0.5));
        assert_eq!(preview.annualized_roi, Some(0.5 * 365.0 / 30.0));
        // nothing changed
        assert_eq!(pos.legs[0].expiry, "2025-10-17");
    }

    #[test]
    fn test_preview_roll_bad_index() {
        let pos = Position::default();
        assert!(preview_roll(&pos, 0, &RollRequest::default(), today()).is_err());
    }

    #[test]
    fn test_suggest_and_apply_auto_rolls() {
        let mut positions = vec![Position {
            id: "p".to_string(),
            title: "SPY puts".to_string(),
            legs: vec![
                short_put("2025-10-15", "2"),
                short_put("2025-11-21", "1"),
                Leg {
                    action: Action::Buy,
                    ..short_put("2025-10-15", "1")
                },
            ],
            ..Default::default()
        }];

        let rules = AutoRollRules::default();
        let suggestions = suggest_rolls(&positions, &rules, today());
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].dte, 5);
        assert_eq!(suggestions[0].new_expiry, "2025-10-29");
        assert_eq!(suggestions[0].estimated_credit, 20.0);

        let report = apply_auto_rolls(&mut positions, &rules, today()).unwrap();
        assert_eq!(report, AutoRollReport { suggested: 1, applied: 1 });
        let leg = &positions[0].legs[0];
        assert_eq!(leg.expiry, "2025-10-29");
        assert_eq!(leg.pl, "20");
        assert!(leg.notes.contains("Auto-rolled +20.00 to 2025-10-29"));
    }
}
