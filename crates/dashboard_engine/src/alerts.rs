use chrono::{NaiveDateTime, NaiveTime};
use models::Position;
use serde::Serialize;

use crate::metrics::{dte, parse_iso};
use crate::round1;

/// Options are treated as expiring at market close on the expiry date.
const EXPIRY_HOUR: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiryAlert {
    pub position_id: String,
    pub position_title: String,
    pub leg_id: String,
    pub ticker: String,
    pub option_type: String,
    pub action: String,
    pub strike: String,
    pub expiry: String,
    pub dte: i64,
    pub hours_left: f64,
}

impl ExpiryAlert {
    pub fn message(&self) -> String {
        format!(
            "{} - {} {} {} {} expires {} ({} DTE)",
            self.position_title,
            self.ticker,
            self.option_type,
            self.action,
            self.strike,
            self.expiry,
            self.dte
        )
    }
}

/// Open legs whose expiry close falls within `lead_hours` after `now`,
/// soonest first.
pub fn expiry_alerts(positions: &[Position], now: NaiveDateTime, lead_hours: u32) -> Vec<ExpiryAlert> {
    let close_time = NaiveTime::from_hms_opt(EXPIRY_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    let lead_secs = i64::from(lead_hours) * 3600;

    let mut alerts = Vec::new();
    for p in positions {
        for leg in p.legs.iter().filter(|l| l.is_open()) {
            let Some(expiry) = parse_iso(&leg.expiry) else {
                continue;
            };
            let secs = (expiry.and_time(close_time) - now).num_seconds();
            if secs <= 0 || secs >= lead_secs {
                continue;
            }
            alerts.push(ExpiryAlert {
                position_id: p.id.clone(),
                position_title: p.title.clone(),
                leg_id: leg.id.clone(),
                ticker: leg.ticker.clone(),
                option_type: leg.option_type.to_string(),
                action: leg.action.to_string(),
                strike: leg.strike.clone(),
                expiry: leg.expiry.clone(),
                dte: dte(&leg.expiry, now.date()).unwrap_or(0),
                hours_left: round1(secs as f64 / 3600.0),
            });
        }
    }
    alerts.sort_by(|a, b| a.hours_left.total_cmp(&b.hours_left));
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Leg, LegStatus};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn leg(id: &str, expiry: &str) -> Leg {
        Leg {
            id: id.to_string(),
            ticker: "SPY".to_string(),
            strike: "500".to_string(),
            expiry: expiry.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_alerts_within_lead_time() {
        let mut closed = leg("closed", "2025-10-10");
        closed.status = LegStatus::Closed;
        let positions = vec![Position {
            id: "p".to_string(),
            title: "SPY puts".to_string(),
            legs: vec![
                leg("tomorrow", "2025-10-11"),
                leg("today", "2025-10-10"),
                leg("far", "2025-10-20"),
                leg("past", "2025-10-09"),
                closed,
            ],
            ..Default::default()
        }];

        let alerts = expiry_alerts(&positions, at("2025-10-10 10:00"), 36);
        let ids: Vec<&str> = alerts.iter().map(|a| a.leg_id.as_str()).collect();
        assert_eq!(ids, vec!["today", "tomorrow"]);
        assert_eq!(alerts[0].hours_left, 6.0);
        assert_eq!(alerts[1].hours_left, 30.0);
        assert_eq!(alerts[1].dte, 1);
        assert_eq!(
            alerts[1].message(),
            "SPY puts - SPY Call Sell 500 expires 2025-10-11 (1 DTE)"
        );
    }

    #[test]
    fn test_zero_lead_time_never_alerts() {
        let positions = vec![Position {
            legs: vec![leg("today", "2025-10-10")],
            ..Default::default()
        }];
        assert!(expiry_alerts(&positions, at("2025-10-10 10:00"), 0).is_empty());
    }
}
