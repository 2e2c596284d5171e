//! Lifecycle operations on positions and their legs.
//!
//! Every operation that inserts or removes legs keeps the group index lists in
//! step with the leg vector.

use models::{
    format_decimal, Action, Group, Leg, LegStatus, OptionType, Position, PositionStatus,
    DEFAULT_STRATEGY,
};
use thiserror::Error;

use crate::combos::refresh_combos;
use crate::ids::make_unique_id;
use crate::today_iso;

#[derive(Debug, Error, PartialEq)]
pub enum LegOpError {
    #[error("leg index {index} out of range (position has {len} legs)")]
    LegOutOfRange { index: usize, len: usize },

    #[error("group '{0}' not found")]
    GroupNotFound(String),

    #[error("position '{0}' not found")]
    PositionNotFound(String),

    #[error("leg '{0}' has no contracts left")]
    NoContracts(String),

    #[error("invalid contracts value '{0}'")]
    InvalidContracts(String),

    #[error("not enough shares to deliver: have {have}, need {need}")]
    InsufficientShares { have: u64, need: u64 },

    #[error("leg '{0}' is neither a short put nor a short call")]
    InvalidAssignment(String),
}

fn check_index(pos: &Position, index: usize) -> Result<(), LegOpError> {
    if index < pos.legs.len() {
        Ok(())
    } else {
        Err(LegOpError::LegOutOfRange {
            index,
            len: pos.legs.len(),
        })
    }
}

fn date_or_today(date: &str) -> String {
    let d = date.trim();
    if d.is_empty() { today_iso() } else { d.to_string() }
}

/// Hashed leg id, unique within the position.
pub fn new_leg_id(pos: &Position, key: &str) -> String {
    let key = format!("{}|{}|{}", pos.id, key, pos.legs.len());
    make_unique_id("LEG", &key, |candidate| pos.legs.iter().any(|l| l.id == candidate))
}

// Manual entry

#[derive(Debug, Clone, Default)]
pub struct NewPosition {
    pub title: String,
    pub strategy: String,
    pub open_date: String,
    pub cost_basis: String,
    pub shares: u64,
    pub tags: Vec<String>,
    pub notes: String,
    pub tax_country: String,
    pub account_type: String,
}

/// Builds an open position with an id unique among `existing`.
pub fn create_position(input: NewPosition, existing: &[Position]) -> Position {
    let open_date = date_or_today(&input.open_date);
    let key = format!("{}|{}", input.title, open_date);
    let id = make_unique_id("POS", &key, |candidate| existing.iter().any(|p| p.id == candidate));

    let mut pos = Position {
        id,
        title: input.title.trim().to_string(),
        strategy: if input.strategy.trim().is_empty() {
            DEFAULT_STRATEGY.to_string()
        } else {
            input.strategy.trim().to_string()
        },
        open_date,
        cost_basis: input.cost_basis,
        shares: input.shares,
        notes: input.notes,
        tax_country: input.tax_country,
        account_type: input.account_type,
        ..Default::default()
    };
    for tag in &input.tags {
        pos.add_tag(tag);
    }
    pos
}

/// Removes a position by id and returns it.
pub fn remove_position(positions: &mut Vec<Position>, id: &str) -> Result<Position, LegOpError> {
    let idx = positions
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| LegOpError::PositionNotFound(id.to_string()))?;
    Ok(positions.remove(idx))
}

#[derive(Debug, Clone, Default)]
pub struct NewLeg {
    pub ticker: String,
    pub option_type: OptionType,
    pub action: Action,
    pub strike: String,
    pub expiry: String,
    pub premium: String,
    pub contracts: String,
    pub underlying: String,
    pub fees: String,
    pub notes: String,
}

/// Appends an open leg dated on the position's open date and reruns spread
/// detection. Returns the new leg's index.
pub fn add_leg(pos: &mut Position, input: NewLeg) -> Result<usize, LegOpError> {
    let contracts = input.contracts.trim().parse::<f64>().unwrap_or(0.0);
    if !(contracts >= 1.0) || contracts.fract() != 0.0 {
        return Err(LegOpError::InvalidContracts(input.contracts));
    }

    let ticker = input.ticker.trim().to_uppercase();
    let key = format!(
        "{}|{}|{}|{}|{}",
        ticker, input.option_type, input.action, input.strike, input.expiry
    );
    let leg = Leg {
        id: new_leg_id(pos, &key),
        ticker,
        option_type: input.option_type,
        action: input.action,
        strike: input.strike,
        expiry: input.expiry,
        premium: input.premium,
        contracts: format_decimal(contracts),
        underlying: input.underlying,
        fees: if input.fees.trim().is_empty() {
            "0".to_string()
        } else {
            input.fees
        },
        open_date: date_or_today(&pos.open_date),
        status: LegStatus::Open,
        notes: input.notes,
        ..Default::default()
    };

    pos.legs.push(leg);
    refresh_combos(pos);
    Ok(pos.legs.len() - 1)
}

/// Edits a leg in place, then re-uppercases the ticker and reruns detection.
pub fn update_leg(
    pos: &mut Position,
    index: usize,
    edit: impl FnOnce(&mut Leg),
) -> Result<(), LegOpError> {
    check_index(pos, index)?;
    let leg = &mut pos.legs[index];
    edit(leg);
    leg.ticker = leg.ticker.trim().to_uppercase();
    refresh_combos(pos);
    Ok(())
}

// Closing

pub fn close_leg(pos: &mut Position, index: usize, pl: f64, date: &str) -> Result<(), LegOpError> {
    check_index(pos, index)?;
    let leg = &mut pos.legs[index];
    leg.status = LegStatus::Closed;
    leg.pl = format_decimal(pl);
    leg.close_date = date_or_today(date);
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PartialClose {
    pub contracts: u64,
    /// Realized P&L of the closed part, in currency.
    pub pl_total: f64,
    pub fees: f64,
    pub date: String,
}

fn shift_groups_for_insert(pos: &mut Position, at: usize) {
    for group in &mut pos.groups {
        for idx in &mut group.legs {
            if *idx >= at {
                *idx += 1;
            }
        }
    }
}

/// Splits `req.contracts` (clamped to `1..=total`) off the leg into a closed
/// copy inserted right after it. Returns the index of the closed copy.
pub fn partial_close_leg(
    pos: &mut Position,
    index: usize,
    req: PartialClose,
) -> Result<usize, LegOpError> {
    check_index(pos, index)?;

    let total = pos.legs[index].contracts_value().max(0.0).floor() as u64;
    if total == 0 {
        return Err(LegOpError::NoContracts(pos.legs[index].id.clone()));
    }
    let qty = req.contracts.clamp(1, total);
    let remaining = total - qty;
    let date = date_or_today(&req.date);

    let mut closed = pos.legs[index].clone();
    closed.id = new_leg_id(pos, &format!("{}|partial", closed.id));
    closed.contracts = qty.to_string();
    closed.status = LegStatus::Closed;
    closed.close_date = date.clone();
    closed.pl = format_decimal(req.pl_total);
    closed.fees = format_decimal(closed.fees_value() + req.fees);

    let leg = &mut pos.legs[index];
    leg.contracts = remaining.to_string();
    if remaining == 0 {
        leg.status = LegStatus::Closed;
        if leg.close_date.is_empty() {
            leg.close_date = date;
        }
    }

    let at = index + 1;
    shift_groups_for_insert(pos, at);
    pos.legs.insert(at, closed);
    Ok(at)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupLegClose {
    pub pl_total: f64,
    pub fees: f64,
}

/// Closes `pct` (0..=1) of every open leg in a group, at least one contract
/// each. `outcomes` lines up with the group's leg order; missing entries
/// close at zero. Returns the number of legs closed.
pub fn close_group(
    pos: &mut Position,
    group_id: &str,
    pct: f64,
    outcomes: &[GroupLegClose],
    date: &str,
) -> Result<usize, LegOpError> {
    let group = pos
        .groups
        .iter()
        .find(|g| g.id == group_id)
        .ok_or_else(|| LegOpError::GroupNotFound(group_id.to_string()))?;

    let pct = pct.clamp(0.0, 1.0);
    let mut work: Vec<(usize, GroupLegClose)> = group
        .legs
        .iter()
        .enumerate()
        .map(|(k, &li)| (li, outcomes.get(k).copied().unwrap_or_default()))
        .filter(|(li, _)| pos.legs.get(*li).map(|l| l.is_open()).unwrap_or(false))
        .collect();

    // Highest index first so earlier insertions never move pending legs
    work.sort_by(|a, b| b.0.cmp(&a.0));
    work.dedup_by_key(|(li, _)| *li);

    let mut closed = 0;
    for (li, outcome) in work {
        let contracts = pos.legs[li].contracts_value();
        let qty = ((contracts * pct).floor() as u64).max(1);
        partial_close_leg(
            pos,
            li,
            PartialClose {
                contracts: qty,
                pl_total: outcome.pl_total,
                fees: outcome.fees,
                date: date.to_string(),
            },
        )?;
        closed += 1;
    }
    Ok(closed)
}

pub fn close_position(pos: &mut Position, date: &str) {
    pos.status = PositionStatus::Closed;
    pos.close_date = date_or_today(date);
}

/// Sets the status; closing a position without a close date stamps one.
pub fn set_position_status(pos: &mut Position, status: PositionStatus, date: &str) {
    pos.status = status;
    if status == PositionStatus::Closed && pos.close_date.is_empty() {
        pos.close_date = date_or_today(date);
    }
}

// Structure

/// Drops out-of-range and repeated indices from every group.
pub fn revalidate_groups(pos: &mut Position) {
    let len = pos.legs.len();
    for group in &mut pos.groups {
        let mut seen = Vec::with_capacity(group.legs.len());
        group.legs.retain(|&i| {
            if i >= len || seen.contains(&i) {
                false
            } else {
                seen.push(i);
                true
            }
        });
    }
}

/// Removes a leg and compacts groups: the index is dropped, higher ones shift
/// down, and groups left with fewer than two legs are deleted.
pub fn remove_leg(pos: &mut Position, index: usize) -> Result<Leg, LegOpError> {
    check_index(pos, index)?;
    let leg = pos.legs.remove(index);

    for group in &mut pos.groups {
        group.legs.retain(|&i| i != index);
        for i in &mut group.legs {
            if *i > index {
                *i -= 1;
            }
        }
    }
    pos.groups.retain(|g| g.legs.len() >= 2);
    revalidate_groups(pos);

    Ok(leg)
}

/// Registers a manual group. Returns its id.
pub fn add_group(pos: &mut Position, name: &str, legs: Vec<usize>) -> Result<String, LegOpError> {
    for &i in &legs {
        check_index(pos, i)?;
    }
    let key = format!("{}|{}|{}", pos.id, name, pos.groups.len());
    let id = make_unique_id("GRP", &key, |candidate| pos.groups.iter().any(|g| g.id == candidate));
    pos.groups.push(Group {
        id: id.clone(),
        name: name.trim().to_string(),
        legs,
    });
    revalidate_groups(pos);
    Ok(id)
}

pub fn delete_group(pos: &mut Position, group_id: &str) -> Result<Group, LegOpError> {
    let idx = pos
        .groups
        .iter()
        .position(|g| g.id == group_id)
        .ok_or_else(|| LegOpError::GroupNotFound(group_id.to_string()))?;
    Ok(pos.groups.remove(idx))
}

pub fn edit_group(
    pos: &mut Position,
    group_id: &str,
    name: Option<&str>,
    legs: Option<Vec<usize>>,
) -> Result<(), LegOpError> {
    let group = pos
        .groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| LegOpError::GroupNotFound(group_id.to_string()))?;
    if let Some(name) = name {
        group.name = name.trim().to_string();
    }
    if let Some(legs) = legs {
        group.legs = legs;
    }
    revalidate_groups(pos);
    Ok(())
}

// Assignment

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentKind {
    /// Short put assigned: shares are received at the strike.
    PutAssigned,
    /// Short call assigned: shares are delivered at the strike.
    CallAssigned,
}

pub fn apply_assignment(
    pos: &mut Position,
    index: usize,
    kind: AssignmentKind,
    date: &str,
) -> Result<(), LegOpError> {
    check_index(pos, index)?;

    let contracts = pos.legs[index].contracts_value().max(0.0);
    let qty = (contracts * 100.0).round() as u64;
    let strike = pos.legs[index].strike_value();

    match kind {
        AssignmentKind::PutAssigned => {
            let prev_shares = pos.shares;
            let prev_basis = pos.cost_basis_value();
            let new_shares = prev_shares + qty;
            let new_basis = if new_shares > 0 {
                (prev_shares as f64 * prev_basis + strike * qty as f64) / new_shares as f64
            } else {
                0.0
            };
            pos.shares = new_shares;
            pos.cost_basis = format_decimal(new_basis);
        }
        AssignmentKind::CallAssigned => {
            if pos.shares < qty {
                return Err(LegOpError::InsufficientShares {
                    have: pos.shares,
                    need: qty,
                });
            }
            let basis = pos.cost_basis_value();
            let pl_shares = (strike - basis) * qty as f64;
            let leg = &mut pos.legs[index];
            leg.pl = format_decimal(leg.pl_value() + pl_shares);
            pos.shares -= qty;
        }
    }

    pos.status = PositionStatus::Assigned;
    let leg = &mut pos.legs[index];
    leg.status = LegStatus::Assigned;
    leg.close_date = date_or_today(date);
    Ok(())
}

/// Assigns a short put or short call, picking the kind from the leg.
pub fn assign_leg(pos: &mut Position, index: usize, date: &str) -> Result<AssignmentKind, LegOpError> {
    check_index(pos, index)?;
    let leg = &pos.legs[index];
    let kind = match (leg.option_type, leg.action) {
        (OptionType::Put, Action::Sell) => AssignmentKind::PutAssigned,
        (OptionType::Call, Action::Sell) => AssignmentKind::CallAssigned,
        _ => return Err(LegOpError::InvalidAssignment(leg.id.clone())),
    };
    apply_assignment(pos, index, kind, date)?;
    Ok(kind)
}

// Rolling

#[derive(Debug, Clone, Default)]
pub struct RollRequest {
    /// Blank keeps the current expiry.
    pub new_expiry: String,
    /// Blank keeps the current strike.
    pub new_strike: String,
    /// Extra premium per contract, received (+) or paid (-).
    pub premium_per_contract: f64,
    pub fees: f64,
}

pub fn roll_net_credit(leg: &Leg, req: &RollRequest) -> f64 {
    req.premium_per_contract * leg.contracts_value() * 100.0 - req.fees
}

/// Moves the leg to the new expiry/strike and books the net credit into its
/// P&L. Returns the net credit.
pub fn apply_roll(pos: &mut Position, index: usize, req: &RollRequest) -> Result<f64, LegOpError> {
    check_index(pos, index)?;
    let leg = &mut pos.legs[index];
    let net = roll_net_credit(leg, req);

    if !req.new_expiry.trim().is_empty() {
        leg.expiry = req.new_expiry.trim().to_string();
    }
    if !req.new_strike.trim().is_empty() {
        leg.strike = req.new_strike.trim().to_string();
    }
    leg.pl = format_decimal(leg.pl_value() + net);
    leg.notes.push_str(" | Rolled");

    refresh_combos(pos);
    Ok(net)
}

/// Rule-driven roll at the same strike.
pub fn auto_roll_leg(
    pos: &mut Position,
    index: usize,
    new_expiry: &str,
    net_credit: f64,
) -> Result<(), LegOpError> {
    check_index(pos, index)?;
    let leg = &mut pos.legs[index];
    leg.expiry = new_expiry.to_string();
    leg.pl = format_decimal(leg.pl_value() + net_credit);
    leg.notes
        .push_str(&format!(" | Auto-rolled +{:.2} to {}", net_credit, new_expiry));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(id: &str, option_type: OptionType, action: Action, strike: &str, contracts: &str) -> Leg {
        Leg {
            id: id.to_string(),
            ticker: "AAPL".to_string(),
            option_type,
            action,
            strike: strike.to_string(),
            expiry: "2025-10-17".to_string(),
            premium: "1".to_string(),
            contracts: contracts.to_string(),
            fees: "1".to_string(),
            ..Default::default()
        }
    }

    fn position(legs: Vec<Leg>) -> Position {
        Position {
            id: "pos-1".to_string(),
            title: "AAPL".to_string(),
            open_date: "2025-09-01".to_string(),
            legs,
            ..Default::default()
        }
    }

    #[test]
    fn test_partial_close_splits_leg() {
        let mut pos = position(vec![
            leg("a", OptionType::Put, Action::Sell, "180", "5"),
            leg("b", OptionType::Put, Action::Buy, "175", "5"),
        ]);
        refresh_combos(&mut pos);
        assert_eq!(pos.groups[0].legs, vec![0, 1]);

        let at = partial_close_leg(
            &mut pos,
            0,
            PartialClose {
                contracts: 2,
                pl_total: 120.0,
                fees: 1.5,
                date: "2025-09-10".to_string(),
            },
        )
        .unwrap();

        assert_eq!(at, 1);
        assert_eq!(pos.legs.len(), 3);
        assert_eq!(pos.legs[0].contracts, "3");
        assert!(pos.legs[0].is_open());
        let closed = &pos.legs[1];
        assert_eq!(closed.contracts, "2");
        assert_eq!(closed.status, LegStatus::Closed);
        assert_eq!(closed.pl, "120");
        assert_eq!(closed.fees, "2.5");
        assert_eq!(closed.close_date, "2025-09-10");
        assert_ne!(closed.id, "a");
        // the long put moved from 1 to 2
        assert_eq!(pos.groups[0].legs, vec![0, 2]);
    }

    #[test]
    fn test_partial_close_clamps_and_closes_original() {
        let mut pos = position(vec![leg("a", OptionType::Call, Action::Sell, "190", "2")]);
        partial_close_leg(
            &mut pos,
            0,
            PartialClose {
                contracts: 10,
                date: "2025-09-10".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(pos.legs[0].contracts, "0");
        assert_eq!(pos.legs[0].status, LegStatus::Closed);
        assert_eq!(pos.legs[0].close_date, "2025-09-10");
        assert_eq!(pos.legs[1].contracts, "2");
    }

    #[test]
    fn test_partial_close_out_of_range() {
        let mut pos = position(vec![]);
        let err = partial_close_leg(&mut pos, 3, PartialClose::default()).unwrap_err();
        assert_eq!(err, LegOpError::LegOutOfRange { index: 3, len: 0 });
    }

    #[test]
    fn test_close_group_handles_index_shifts() {
        let mut pos = position(vec![
            leg("a", OptionType::Put, Action::Sell, "180", "4"),
            leg("b", OptionType::Put, Action::Buy, "175", "4"),
        ]);
        refresh_combos(&mut pos);
        let gid = pos.groups[0].id.clone();

        let outcomes = [
            GroupLegClose { pl_total: 50.0, fees: 0.0 },
            GroupLegClose { pl_total: -10.0, fees: 0.0 },
        ];
        let closed = close_group(&mut pos, &gid, 0.5, &outcomes, "2025-09-12").unwrap();
        assert_eq!(closed, 2);

        let summary: Vec<(&str, &str, LegStatus)> = pos
            .legs
            .iter()
            .map(|l| (l.strike.as_str(), l.contracts.as_str(), l.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("180", "2", LegStatus::Open),
                ("180", "2", LegStatus::Closed),
                ("175", "2", LegStatus::Open),
                ("175", "2", LegStatus::Closed),
            ]
        );
        assert_eq!(pos.legs[1].pl, "50");
        assert_eq!(pos.legs[3].pl, "-10");
        assert_eq!(pos.groups[0].legs, vec![0, 2]);
    }

    #[test]
    fn test_close_group_unknown_id() {
        let mut pos = position(vec![]);
        let err = close_group(&mut pos, "nope", 1.0, &[], "").unwrap_err();
        assert_eq!(err, LegOpError::GroupNotFound("nope".to_string()));
    }

    #[test]
    fn test_remove_leg_compacts_groups() {
        let mut pos = position(vec![
            leg("a", OptionType::Call, Action::Sell, "190", "1"),
            leg("b", OptionType::Call, Action::Buy, "195", "1"),
            leg("c", OptionType::Put, Action::Sell, "180", "1"),
            leg("d", OptionType::Put, Action::Buy, "175", "1"),
        ]);
        refresh_combos(&mut pos);
        assert_eq!(pos.groups.len(), 3);

        let removed = remove_leg(&mut pos, 1).unwrap();
        assert_eq!(removed.id, "b");

        let names: Vec<&str> = pos.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Put Spread 175/180 2025-10-17", "Iron Condor 2025-10-17"]);
        assert_eq!(pos.groups[0].legs, vec![1, 2]);
        assert_eq!(pos.groups[1].legs, vec![0, 1, 2]);
    }

    #[test]
    fn test_revalidate_drops_bad_indices() {
        let mut pos = position(vec![leg("a", OptionType::Call, Action::Sell, "190", "1")]);
        pos.groups.push(Group {
            id: "g".to_string(),
            name: "manual".to_string(),
            legs: vec![0, 0, 7],
        });
        revalidate_groups(&mut pos);
        assert_eq!(pos.groups[0].legs, vec![0]);
    }

    #[test]
    fn test_put_assignment_weights_cost_basis() {
        let mut pos = position(vec![leg("a", OptionType::Put, Action::Sell, "50", "1")]);
        pos.shares = 100;
        pos.cost_basis = "40".to_string();

        let kind = assign_leg(&mut pos, 0, "2025-10-17").unwrap();
        assert_eq!(kind, AssignmentKind::PutAssigned);
        assert_eq!(pos.shares, 200);
        assert_eq!(pos.cost_basis, "45");
        assert_eq!(pos.status, PositionStatus::Assigned);
        assert_eq!(pos.legs[0].status, LegStatus::Assigned);
        assert_eq!(pos.legs[0].close_date, "2025-10-17");
    }

    #[test]
    fn test_call_assignment_books_share_pl() {
        let mut pos = position(vec![leg("a", OptionType::Call, Action::Sell, "55", "1")]);
        pos.shares = 100;
        pos.cost_basis = "45".to_string();
        pos.legs[0].pl = "30".to_string();

        apply_assignment(&mut pos, 0, AssignmentKind::CallAssigned, "2025-10-17").unwrap();
        assert_eq!(pos.shares, 0);
        assert_eq!(pos.legs[0].pl, "1030");
    }

    #[test]
    fn test_call_assignment_needs_shares() {
        let mut pos = position(vec![leg("a", OptionType::Call, Action::Sell, "55", "2")]);
        pos.shares = 100;
        let err = apply_assignment(&mut pos, 0, AssignmentKind::CallAssigned, "").unwrap_err();
        assert_eq!(err, LegOpError::InsufficientShares { have: 100, need: 200 });
        assert_eq!(pos.status, PositionStatus::Open);
    }

    #[test]
    fn test_long_leg_cannot_be_assigned() {
        let mut pos = position(vec![leg("a", OptionType::Put, Action::Buy, "50", "1")]);
        let err = assign_leg(&mut pos, 0, "").unwrap_err();
        assert_eq!(err, LegOpError::InvalidAssignment("a".to_string()));
    }

    #[test]
    fn test_roll_books_net_credit() {
        let mut pos = position(vec![leg("a", OptionType::Put, Action::Sell, "180", "2")]);
        pos.legs[0].pl = "10".to_string();
        let req = RollRequest {
            new_expiry: "2025-11-21".to_string(),
            new_strike: "175".to_string(),
            premium_per_contract: 0.5,
            fees: 2.0,
        };
        assert_eq!(roll_net_credit(&pos.legs[0], &req), 98.0);

        let net = apply_roll(&mut pos, 0, &req).unwrap();
        assert_eq!(net, 98.0);
        let l = &pos.legs[0];
        assert_eq!(l.expiry, "2025-11-21");
        assert_eq!(l.strike, "175");
        assert_eq!(l.pl, "108");
        assert!(l.notes.ends_with(" | Rolled"));
    }

    #[test]
    fn test_add_leg_rejects_bad_contracts() {
        let mut pos = position(vec![]);
        let err = add_leg(
            &mut pos,
            NewLeg {
                ticker: "aapl".to_string(),
                contracts: "0".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, LegOpError::InvalidContracts("0".to_string()));
    }

    #[test]
    fn test_add_leg_detects_spread() {
        let mut pos = position(vec![leg("a", OptionType::Put, Action::Sell, "180", "1")]);
        let idx = add_leg(
            &mut pos,
            NewLeg {
                ticker: "aapl".to_string(),
                option_type: OptionType::Put,
                action: Action::Buy,
                strike: "175".to_string(),
                expiry: "2025-10-17".to_string(),
                premium: "0.4".to_string(),
                contracts: "1".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(idx, 1);
        assert_eq!(pos.legs[1].ticker, "AAPL");
        assert_eq!(pos.legs[1].fees, "0");
        assert_eq!(pos.legs[1].open_date, "2025-09-01");
        assert_eq!(pos.legs[1].width, Some(5.0));
        assert_eq!(pos.groups.len(), 1);
    }

    #[test]
    fn test_create_position_defaults() {
        let existing = vec![create_position(
            NewPosition {
                title: "CSP MSFT".to_string(),
                open_date: "2025-09-01".to_string(),
                ..Default::default()
            },
            &[],
        )];
        let pos = create_position(
            NewPosition {
                title: "CSP MSFT".to_string(),
                open_date: "2025-09-01".to_string(),
                tags: vec!["wheel".to_string(), "Wheel".to_string()],
                ..Default::default()
            },
            &existing,
        );
        assert_ne!(pos.id, existing[0].id);
        assert_eq!(pos.strategy, DEFAULT_STRATEGY);
        assert_eq!(pos.tags, vec!["wheel"]);
        assert_eq!(pos.status, PositionStatus::Open);
    }

    #[test]
    fn test_status_closed_stamps_date_once() {
        let mut pos = position(vec![]);
        set_position_status(&mut pos, PositionStatus::Closed, "2025-09-30");
        assert_eq!(pos.close_date, "2025-09-30");
        set_position_status(&mut pos, PositionStatus::Closed, "2025-10-30");
        assert_eq!(pos.close_date, "2025-09-30");
        close_position(&mut pos, "2025-10-30");
        assert_eq!(pos.close_date, "2025-10-30");
    }

    #[test]
    fn test_group_crud() {
        let mut pos = position(vec![
            leg("a", OptionType::Call, Action::Sell, "190", "1"),
            leg("b", OptionType::Call, Action::Sell, "200", "1"),
        ]);
        assert!(add_group(&mut pos, "calls", vec![0, 5]).is_err());

        let id = add_group(&mut pos, "calls", vec![0, 1]).unwrap();
        edit_group(&mut pos, &id, Some("short calls"), Some(vec![1, 1, 0])).unwrap();
        assert_eq!(pos.groups[0].name, "short calls");
        assert_eq!(pos.groups[0].legs, vec![1, 0]);

        delete_group(&mut pos, &id).unwrap();
        assert!(pos.groups.is_empty());
        assert!(delete_group(&mut pos, &id).is_err());
    }

    #[test]
    fn test_remove_position_by_id() {
        let mut positions = vec![position(vec![])];
        assert!(remove_position(&mut positions, "missing").is_err());
        let removed = remove_position(&mut positions, "pos-1").unwrap();
        assert_eq!(removed.title, "AAPL");
        assert!(positions.is_empty());
    }
}
