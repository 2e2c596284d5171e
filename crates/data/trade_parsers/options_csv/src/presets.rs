//! Broker header dictionaries and preset auto-detection.
//!
//! Each preset maps the fourteen canonical fields to an ordered list of
//! header aliases. Aliases are compared after [`normalize_header`], so they
//! are written here in their raw, human-readable form.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::ImportError;
use crate::tokenizer::normalize_header;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Ticker,
    OptionType,
    Action,
    OpenClose,
    Strike,
    Expiry,
    Premium,
    Contracts,
    Fees,
    Pl,
    OpenDate,
    CloseDate,
    Notes,
    Title,
}

impl CanonicalField {
    pub const COUNT: usize = 14;

    pub const ALL: [CanonicalField; Self::COUNT] = [
        CanonicalField::Ticker,
        CanonicalField::OptionType,
        CanonicalField::Action,
        CanonicalField::OpenClose,
        CanonicalField::Strike,
        CanonicalField::Expiry,
        CanonicalField::Premium,
        CanonicalField::Contracts,
        CanonicalField::Fees,
        CanonicalField::Pl,
        CanonicalField::OpenDate,
        CanonicalField::CloseDate,
        CanonicalField::Notes,
        CanonicalField::Title,
    ];

    /// Fields a file must provide before any row is imported.
    pub const REQUIRED: [CanonicalField; 7] = [
        CanonicalField::Ticker,
        CanonicalField::OptionType,
        CanonicalField::Action,
        CanonicalField::Strike,
        CanonicalField::Expiry,
        CanonicalField::Premium,
        CanonicalField::Contracts,
    ];

    /// Fields an OCC option symbol can stand in for.
    pub const OCC_RECOVERABLE: [CanonicalField; 4] = [
        CanonicalField::Ticker,
        CanonicalField::OptionType,
        CanonicalField::Strike,
        CanonicalField::Expiry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Ticker => "ticker",
            CanonicalField::OptionType => "option_type",
            CanonicalField::Action => "action",
            CanonicalField::OpenClose => "open_close",
            CanonicalField::Strike => "strike",
            CanonicalField::Expiry => "expiry",
            CanonicalField::Premium => "premium",
            CanonicalField::Contracts => "contracts",
            CanonicalField::Fees => "fees",
            CanonicalField::Pl => "pl",
            CanonicalField::OpenDate => "open_date",
            CanonicalField::CloseDate => "close_date",
            CanonicalField::Notes => "notes",
            CanonicalField::Title => "title",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aliases per canonical field, in [`CanonicalField::ALL`] order.
type AliasTable = [&'static [&'static str]; CanonicalField::COUNT];

#[derive(Debug)]
pub struct Preset {
    pub key: &'static str,
    pub signatures: &'static [&'static str],
    aliases: AliasTable,
}

impl Preset {
    pub fn aliases(&self, field: CanonicalField) -> &'static [&'static str] {
        self.aliases[field.index()]
    }
}

pub static PRESETS: [Preset; 7] = [
    Preset {
        key: "ibkr",
        signatures: &["underlying symbol", "realized p/l", "trade date/time", "open/close indicator"],
        aliases: [
            &["underlying symbol", "underlying", "simbolo subyacente", "root"],
            &["put/call", "right", "tipo", "put o call", "right type"],
            &["buy/sell", "side", "compra/venta", "action"],
            &["open/close", "open close", "opening/closing", "oc", "opening or closing", "open/close indicator"],
            &["strike", "strike price", "precio de ejercicio"],
            &["expiration date", "expiration", "fecha de vencimiento", "vencimiento", "expiry"],
            &["trade price", "price", "fill price", "precio de la operacion", "precio de ejecucion"],
            &["quantity", "qty", "cantidad", "contracts"],
            &["commission", "commissions & fees", "comisiones", "comision", "fees"],
            &["realized p/l", "p/l", "profit/loss", "ganancia/perdida realizada", "p&l realizado"],
            &["trade date", "trade date/time", "fecha de operacion", "fecha/hora de la operacion"],
            &["close date", "closing date"],
            &["description", "descripcion", "instrument", "option symbol"],
            &["underlying symbol", "underlying", "root"],
        ],
    },
    Preset {
        key: "tos",
        signatures: &["order #", "execution time", "avg price", "position effect"],
        aliases: [
            &["underlying symbol", "symbol", "root", "symbol root"],
            &["put/call", "right", "type", "option type"],
            &["buy/sell", "side", "action", "b/s", "order action", "instruction"],
            &["open/close", "opening/closing", "oc", "position effect"],
            &["strike", "strike price"],
            &["expiration date", "expiration", "exp date"],
            &["price", "trade price", "fill price", "avg price", "average price"],
            &["quantity", "qty", "contracts", "filled quantity"],
            &["commission", "fees", "exchange fees", "reg fees", "clearing fees"],
            &["p/l", "realized p/l", "realized profit/loss"],
            &["trade date", "date", "fill date", "execution time"],
            &[],
            &["description", "instrument", "order #", "order id"],
            &["underlying symbol", "symbol", "root"],
        ],
    },
    Preset {
        key: "tasty",
        signatures: &["tasty", "fees", "clearing fee"],
        aliases: [
            &["underlying symbol", "underlying", "symbol"],
            &["put/call", "right", "type", "option type"],
            &["side", "action", "buy/sell", "b/s", "instruction"],
            &["open/close", "opening/closing", "position effect", "oc"],
            &["strike", "strike price"],
            &["expiration date", "expiration", "expiry"],
            &["price", "trade price", "fill price"],
            &["qty", "quantity", "contracts"],
            &["commission", "fees", "clearing fee", "exchange fee", "reg fee"],
            &["realized p/l", "p/l", "realized profit/loss"],
            &["date", "trade date", "fill date"],
            &[],
            &["description", "notes"],
            &["underlying symbol", "underlying", "symbol"],
        ],
    },
    Preset {
        key: "tradestation",
        signatures: &["trade station", "closed pl", "execution price"],
        aliases: [
            &["symbol", "underlying symbol"],
            &["put/call", "right", "type", "option type", "call/put"],
            &["buy/sell", "side", "action", "b/s", "instruction"],
            &["open/close", "opening/closing", "position effect", "oc"],
            &["strike", "strike price"],
            &["expiration date", "expiration", "expiry"],
            &["price", "fill price", "trade price", "execution price"],
            &["quantity", "qty", "contracts"],
            &["commission", "fees", "exchange fees", "clearing fees", "regulatory fees"],
            &["realized p/l", "p/l", "closed pl", "realized profit/loss"],
            &["date", "trade date", "execution time", "fill date"],
            &[],
            &["description", "comment"],
            &["symbol", "underlying symbol"],
        ],
    },
    Preset {
        key: "tradier",
        signatures: &["position effect", "root symbol", "option symbol"],
        aliases: [
            &["symbol", "underlying symbol", "underlying", "root symbol", "option symbol", "instrument"],
            &["put/call", "right", "type", "option type", "option side"],
            &["buy/sell", "side", "action", "b/s", "order action", "instruction", "transaction"],
            &["position effect", "open/close", "opening/closing", "oc", "effect"],
            &["strike", "strike price", "option strike"],
            &["expiration", "expiration date", "expiry", "option expiration"],
            &["price", "trade price", "fill price", "execution price", "amount"],
            &["quantity", "qty", "contracts", "filled quantity", "filled qty"],
            &[
                "commission",
                "fees",
                "exchange fees",
                "regulatory fees",
                "clearing fees",
                "reg fee",
                "clearing fee",
                "other fees",
            ],
            &["realized p/l", "p/l", "realized profit/loss", "p/l realized", "gain/loss"],
            &["trade date", "date", "execution time", "trade time", "timestamp"],
            &["close date", "closing date"],
            &["description", "memo", "note", "comment", "details"],
            &["symbol", "underlying", "root symbol", "option symbol"],
        ],
    },
    Preset {
        key: "tradier_activity",
        signatures: &["activity id", "amount", "description"],
        aliases: [
            &["symbol"],
            &["right", "type", "option type", "description"],
            &["type", "transaction", "action"],
            &["position effect", "effect", "open/close"],
            &["strike", "option strike", "description"],
            &["expiration", "option expiration", "description"],
            &["price", "amount", "trade price", "execution price"],
            &["quantity", "qty"],
            &["commission", "fees"],
            &["realized p/l", "p/l", "gain/loss"],
            &["date", "trade date", "timestamp"],
            &["close date"],
            &["description", "memo", "details"],
            &["symbol"],
        ],
    },
    Preset {
        key: "tradier_statement",
        signatures: &["root symbol", "option symbol", "realized p/l"],
        aliases: [
            &["root symbol", "underlying", "symbol"],
            &["right", "option right"],
            &["buy/sell", "side", "action"],
            &["position effect", "open/close", "effect"],
            &["strike", "option strike"],
            &["expiration", "option expiration", "expiry"],
            &["price", "trade price", "fill price"],
            &["quantity", "qty", "contracts"],
            &["commission", "fees", "regulatory fees", "clearing fees"],
            &["realized p/l", "p/l", "realized profit/loss"],
            &["trade date", "date", "execution time"],
            &["close date", "closing date"],
            &["note", "comment", "description"],
            &["root symbol", "symbol"],
        ],
    },
];

/// Headers that may carry an OCC option symbol.
pub const OPTION_SYMBOL_ALIASES: [&str; 4] = ["option symbol", "symbol", "symbol (occ)", "occ symbol"];

pub fn find_preset(key: &str) -> Option<&'static Preset> {
    let key = key.trim();
    PRESETS.iter().find(|p| p.key.eq_ignore_ascii_case(key))
}

/// Union of every preset's aliases per field, de-duplicated, in preset
/// declaration order.
pub fn auto_union() -> &'static [Vec<&'static str>; CanonicalField::COUNT] {
    static UNION: OnceLock<[Vec<&'static str>; CanonicalField::COUNT]> = OnceLock::new();
    UNION.get_or_init(|| {
        let mut union: [Vec<&'static str>; CanonicalField::COUNT] = Default::default();
        for preset in &PRESETS {
            for field in CanonicalField::ALL {
                let slot = &mut union[field.index()];
                for alias in preset.aliases(field) {
                    if !slot.contains(alias) {
                        slot.push(*alias);
                    }
                }
            }
        }
        union
    })
}

/// Which dictionary a caller asked for.
#[derive(Debug, Clone, Copy, Default)]
pub enum PresetSelection {
    #[default]
    Auto,
    Named(&'static Preset),
}

impl PresetSelection {
    pub fn key(&self) -> &'static str {
        match self {
            PresetSelection::Auto => "auto",
            PresetSelection::Named(p) => p.key,
        }
    }

    pub fn aliases(&self, field: CanonicalField) -> &'static [&'static str] {
        match self {
            PresetSelection::Auto => &auto_union()[field.index()],
            PresetSelection::Named(p) => p.aliases(field),
        }
    }
}

impl PartialEq for PresetSelection {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl FromStr for PresetSelection {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("auto") {
            return Ok(PresetSelection::Auto);
        }
        find_preset(t)
            .map(PresetSelection::Named)
            .ok_or_else(|| ImportError::UnknownPreset(t.to_string()))
    }
}

/// Column index for the first alias that hits: exact header match first,
/// then a header starting with the alias, then one containing it.
pub fn pick_header<S: AsRef<str>>(aliases: &[S], norm_headers: &[String]) -> Option<usize> {
    for alias in aliases {
        let a = normalize_header(alias.as_ref());
        if a.is_empty() {
            continue;
        }
        if let Some(i) = norm_headers.iter().position(|h| *h == a) {
            return Some(i);
        }
        if let Some(i) = norm_headers.iter().position(|h| h.starts_with(&a)) {
            return Some(i);
        }
        if let Some(i) = norm_headers.iter().position(|h| h.contains(&a)) {
            return Some(i);
        }
    }
    None
}

fn any_header_contains(norm_headers: &[String], raw: &str) -> bool {
    let needle = normalize_header(raw);
    !needle.is_empty() && norm_headers.iter().any(|h| h.contains(&needle))
}

/// Detection score of one preset against a header row.
pub fn preset_score(preset: &Preset, norm_headers: &[String]) -> u32 {
    let mut score = 0;
    for sig in preset.signatures {
        if any_header_contains(norm_headers, sig) {
            score += 2;
        }
    }
    for field in CanonicalField::ALL {
        if preset.aliases(field).iter().any(|a| any_header_contains(norm_headers, a)) {
            score += 1;
        }
    }
    score
}

/// Best scoring preset, `None` when nothing matches at all. Ties keep
/// declaration order.
pub fn detect_preset(norm_headers: &[String]) -> Option<&'static Preset> {
    let mut best: Option<(&'static Preset, u32)> = None;
    for preset in &PRESETS {
        let score = preset_score(preset, norm_headers);
        if score > best.map(|(_, s)| s).unwrap_or(0) {
            best = Some((preset, score));
        }
    }
    best.map(|(p, _)| p)
}

/// Column per canonical field for one file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMapping {
    columns: [Option<usize>; CanonicalField::COUNT],
    pub option_symbol: Option<usize>,
}

impl FieldMapping {
    pub fn build(selection: PresetSelection, norm_headers: &[String]) -> Self {
        let mut mapping = FieldMapping::default();
        for field in CanonicalField::ALL {
            mapping.columns[field.index()] = pick_header(selection.aliases(field), norm_headers);
        }
        mapping.option_symbol = pick_header(&OPTION_SYMBOL_ALIASES, norm_headers);
        mapping
    }

    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns[field.index()]
    }

    /// Required fields without a column. Fields an OCC symbol can supply are
    /// waived when an option-symbol column exists.
    pub fn missing_required(&self) -> Vec<CanonicalField> {
        CanonicalField::REQUIRED
            .into_iter()
            .filter(|f| self.column(*f).is_none())
            .filter(|f| self.option_symbol.is_none() || !CanonicalField::OCC_RECOVERABLE.contains(f))
            .collect()
    }
}
