//! Vertical spread and iron condor detection over a position's legs.
//!
//! Groups reference legs by index. Detection only ever appends groups whose
//! derived name is not already present, so running it repeatedly over an
//! unchanged leg set is a no-op.

use models::{format_decimal, Group, Leg, OptionType, Position};

use crate::ids::make_unique_id;

fn is_vertical_pair(a: &Leg, b: &Leg) -> bool {
    a.ticker == b.ticker
        && a.expiry == b.expiry
        && a.option_type == b.option_type
        && a.action != b.action
}

/// `"{type} Spread {lo}/{hi} {expiry}"`, independent of leg order.
pub fn spread_group_name(a: &Leg, b: &Leg) -> String {
    let (x, y) = (a.strike_value(), b.strike_value());
    let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
    format!(
        "{} Spread {}/{} {}",
        a.option_type,
        format_decimal(lo),
        format_decimal(hi),
        a.expiry
    )
}

pub fn iron_condor_name(expiry: &str) -> String {
    format!("Iron Condor {}", expiry)
}

/// Records the strike distance as `width` on both legs of every vertical pair.
pub fn detect_spreads(pos: &mut Position) {
    let n = pos.legs.len();
    for i in 0..n {
        for j in (i + 1)..n {
            if !is_vertical_pair(&pos.legs[i], &pos.legs[j]) {
                continue;
            }
            let width = (pos.legs[i].strike_value() - pos.legs[j].strike_value()).abs();
            if width > 0.0 {
                pos.legs[i].width = Some(width);
                pos.legs[j].width = Some(width);
            }
        }
    }
}

fn push_group(pos: &mut Position, name: String, legs: Vec<usize>) {
    let key = format!("{}|{}", pos.id, name);
    let id = make_unique_id("GRP", &key, |candidate| {
        pos.groups.iter().any(|g| g.id == candidate)
    });
    pos.groups.push(Group { id, name, legs });
}

fn group_is_all(pos: &Position, group: &Group, option_type: OptionType) -> bool {
    !group.legs.is_empty()
        && group
            .legs
            .iter()
            .all(|&i| pos.legs.get(i).map(|l| l.option_type == option_type).unwrap_or(false))
}

fn first_leg_expiry<'a>(pos: &'a Position, group: &Group) -> Option<&'a str> {
    let idx = *group.legs.first()?;
    let expiry = pos.legs.get(idx)?.expiry.as_str();
    if expiry.is_empty() { None } else { Some(expiry) }
}

/// Registers spread groups and iron condors that are not present yet.
/// Returns the number of groups added.
pub fn create_groups(pos: &mut Position) -> usize {
    let before = pos.groups.len();

    let n = pos.legs.len();
    for i in 0..n {
        for j in (i + 1)..n {
            if !is_vertical_pair(&pos.legs[i], &pos.legs[j]) {
                continue;
            }
            let name = spread_group_name(&pos.legs[i], &pos.legs[j]);
            if !pos.groups.iter().any(|g| g.name == name) {
                push_group(pos, name, vec![i, j]);
            }
        }
    }

    let calls: Vec<Group> = pos
        .groups
        .iter()
        .filter(|g| group_is_all(pos, g, OptionType::Call))
        .cloned()
        .collect();
    let puts: Vec<Group> = pos
        .groups
        .iter()
        .filter(|g| group_is_all(pos, g, OptionType::Put))
        .cloned()
        .collect();

    for cg in &calls {
        for pg in &puts {
            let (Some(exp_c), Some(exp_p)) = (first_leg_expiry(pos, cg), first_leg_expiry(pos, pg))
            else {
                continue;
            };
            if exp_c != exp_p {
                continue;
            }
            let name = iron_condor_name(exp_c);
            if !pos.groups.iter().any(|g| g.name == name) {
                let legs = cg.legs.iter().chain(pg.legs.iter()).copied().collect();
                push_group(pos, name, legs);
            }
        }
    }

    pos.groups.len() - before
}

/// Width detection followed by group registration.
pub fn refresh_combos(pos: &mut Position) -> usize {
    detect_spreads(pos);
    create_groups(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::Action;

    fn leg(option_type: OptionType, action: Action, strike: &str) -> Leg {
        Leg {
            id: format!("{}-{}-{}", option_type, action, strike),
            ticker: "AAPL".to_string(),
            option_type,
            action,
            strike: strike.to_string(),
            expiry: "2025-10-17".to_string(),
            premium: "1".to_string(),
            contracts: "1".to_string(),
            ..Default::default()
        }
    }

    fn iron_condor() -> Position {
        Position {
            id: "ic".to_string(),
            title: "IC AAPL".to_string(),
            legs: vec![
                leg(OptionType::Call, Action::Sell, "190"),
                leg(OptionType::Call, Action::Buy, "195"),
                leg(OptionType::Put, Action::Sell, "180"),
                leg(OptionType::Put, Action::Buy, "175"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_vertical_spread_width_and_name() {
        let mut pos = iron_condor();
        detect_spreads(&mut pos);
        assert_eq!(pos.legs[0].width, Some(5.0));
        assert_eq!(pos.legs[3].width, Some(5.0));

        let name = spread_group_name(&pos.legs[1], &pos.legs[0]);
        assert_eq!(name, "Call Spread 190/195 2025-10-17");
    }

    #[test]
    fn test_iron_condor_group_combines_both_spreads() {
        let mut pos = iron_condor();
        let added = refresh_combos(&mut pos);
        assert_eq!(added, 3);

        let names: Vec<&str> = pos.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Call Spread 190/195 2025-10-17",
                "Put Spread 175/180 2025-10-17",
                "Iron Condor 2025-10-17",
            ]
        );
        assert_eq!(pos.groups[2].legs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let mut pos = iron_condor();
        refresh_combos(&mut pos);
        let groups = pos.groups.clone();

        assert_eq!(refresh_combos(&mut pos), 0);
        assert_eq!(pos.groups, groups);
    }

    #[test]
    fn test_same_side_legs_are_not_a_spread() {
        let mut pos = Position {
            id: "p".to_string(),
            legs: vec![
                leg(OptionType::Put, Action::Sell, "180"),
                leg(OptionType::Put, Action::Sell, "175"),
            ],
            ..Default::default()
        };
        assert_eq!(refresh_combos(&mut pos), 0);
        assert_eq!(pos.legs[0].width, None);
    }

    #[test]
    fn test_equal_strikes_group_without_width() {
        let mut pos = Position {
            id: "p".to_string(),
            legs: vec![
                leg(OptionType::Call, Action::Sell, "180"),
                leg(OptionType::Call, Action::Buy, "180"),
            ],
            ..Default::default()
        };
        assert_eq!(refresh_combos(&mut pos), 1);
        assert_eq!(pos.legs[0].width, None);
        assert_eq!(pos.groups[0].name, "Call Spread 180/180 2025-10-17");
    }
}
