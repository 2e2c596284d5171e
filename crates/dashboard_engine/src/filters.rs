use models::{JournalState, Position, PositionFilter, PositionStatus, SavedView};

fn search_blob(pos: &Position) -> String {
    let legs: Vec<String> = pos
        .legs
        .iter()
        .map(|l| format!("{} {}", l.ticker, l.notes))
        .collect();
    format!("{} {} {} {}", pos.title, pos.notes, pos.tags.join(" "), legs.join(" ")).to_lowercase()
}

fn status_matches(pos: &Position, status: &str) -> bool {
    let s = status.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("all") {
        return true;
    }
    s.parse::<PositionStatus>().map(|st| st == pos.status).unwrap_or(false)
}

pub fn matches_filter(pos: &Position, filter: &PositionFilter) -> bool {
    let q = filter.q.trim().to_lowercase();
    if !q.is_empty() && !search_blob(pos).contains(&q) {
        return false;
    }
    if !status_matches(pos, &filter.status) {
        return false;
    }
    if !filter.tag.trim().is_empty() && !pos.has_tag(&filter.tag) {
        return false;
    }
    // Date bounds compare ISO strings; positions without an open date fall outside any bound
    let from = filter.from.trim();
    if !from.is_empty() && (pos.open_date.is_empty() || pos.open_date.as_str() < from) {
        return false;
    }
    let to = filter.to.trim();
    if !to.is_empty() && (pos.open_date.is_empty() || pos.open_date.as_str() > to) {
        return false;
    }
    true
}

pub fn apply_filters<'a>(positions: &'a [Position], filter: &PositionFilter) -> Vec<&'a Position> {
    positions.iter().filter(|p| matches_filter(p, filter)).collect()
}

/// Saves a view, replacing an existing one with the same name.
pub fn save_view(state: &mut JournalState, name: &str, filters: PositionFilter) {
    let name = name.trim();
    if let Some(view) = state.views.iter_mut().find(|v| v.name == name) {
        view.filters = filters;
    } else {
        state.views.push(SavedView {
            name: name.to_string(),
            filters,
        });
    }
}

pub fn delete_view(state: &mut JournalState, name: &str) -> bool {
    let before = state.views.len();
    state.views.retain(|v| v.name != name.trim());
    state.views.len() != before
}

pub fn find_view<'a>(state: &'a JournalState, name: &str) -> Option<&'a SavedView> {
    state.views.iter().find(|v| v.name == name.trim())
}
