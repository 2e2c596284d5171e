//! Buy/Sell and Open/Close semantics from free-form broker text.

use std::sync::OnceLock;

use models::Action;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub action: Action,
    pub is_close: bool,
}

impl Classification {
    fn new(action: Action, is_close: bool) -> Self {
        Self { action, is_close }
    }

    /// `Sell/Open` style label used in previews.
    pub fn label(&self) -> String {
        format!("{}/{}", self.action, if self.is_close { "Close" } else { "Open" })
    }
}

struct Phrases {
    buy_to_close: Regex,
    sell_to_close: Regex,
    buy_to_open: Regex,
    sell_to_open: Regex,
    sell_side: Regex,
    buy_side: Regex,
}

fn phrases() -> &'static Phrases {
    static P: OnceLock<Phrases> = OnceLock::new();
    P.get_or_init(|| Phrases {
        buy_to_close: Regex::new(r"buy\s*to\s*close|btc\b").expect("valid btc regex"),
        sell_to_close: Regex::new(r"sell\s*to\s*close|stc\b").expect("valid stc regex"),
        buy_to_open: Regex::new(r"buy\s*to\s*open|bto\b").expect("valid bto regex"),
        sell_to_open: Regex::new(r"sell\s*to\s*open|sto\b").expect("valid sto regex"),
        sell_side: Regex::new(r"sell|stc\b|sto\b").expect("valid sell regex"),
        buy_side: Regex::new(r"buy|btc\b|bto\b").expect("valid buy regex"),
    })
}

/// Side named in the action text for the open-indicator path, sell checked first.
fn side_hint(text: &str) -> Option<Action> {
    let p = phrases();
    if p.sell_side.is_match(text) {
        Some(Action::Sell)
    } else if p.buy_side.is_match(text) {
        Some(Action::Buy)
    } else {
        None
    }
}

/// Classifies one row. First match wins:
///
/// 1. buy-to-close phrase, or the open/close column says close
/// 2. sell-to-close phrase
/// 3. buy-to-open phrase, or the open/close column says open
/// 4. sell-to-open phrase
/// 5. bare `sell`, then bare `buy`, both opening
///
/// A close indicator always yields Buy/Close, so a closing sell is only
/// recognized through an explicit sell-to-close phrase. An open indicator
/// keeps the side named in the action text, falling back to Buy. A Buy that
/// still reads as opening with a negative quantity is treated as a close.
/// Anything unrecognized is Sell/Open.
pub fn classify_action(raw_action: &str, quantity: f64, raw_open_close: &str) -> Classification {
    let s = raw_action.trim().to_lowercase();
    let oc = raw_open_close.trim().to_lowercase();
    let p = phrases();

    let mut c = if p.buy_to_close.is_match(&s) || oc.contains("close") {
        Classification::new(Action::Buy, true)
    } else if p.sell_to_close.is_match(&s) {
        Classification::new(Action::Sell, true)
    } else if p.buy_to_open.is_match(&s) {
        Classification::new(Action::Buy, false)
    } else if oc.contains("open") {
        Classification::new(side_hint(&s).unwrap_or(Action::Buy), false)
    } else if p.sell_to_open.is_match(&s) {
        Classification::new(Action::Sell, false)
    } else if s.contains("sell") {
        Classification::new(Action::Sell, false)
    } else if s.contains("buy") {
        Classification::new(Action::Buy, false)
    } else {
        Classification::new(Action::Sell, false)
    };

    if c.action == Action::Buy && !c.is_close && quantity < 0.0 {
        c.is_close = true;
    }
    c
}
