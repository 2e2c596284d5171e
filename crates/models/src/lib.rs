use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_STRATEGY: &str = "(mixta)";
pub const DEFAULT_ALERT_LEAD_HOURS: u32 = 36;

// Enumerations
//
// Stored journals written by older versions carry Spanish labels, so every
// enum parses both spellings and always writes the English one.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PositionStatus {
	#[default]
	Open,
	Closed,
	Rolled,
	Assigned,
	Exercised,
}

impl PositionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			PositionStatus::Open => "Open",
			PositionStatus::Closed => "Closed",
			PositionStatus::Rolled => "Rolled",
			PositionStatus::Assigned => "Assigned",
			PositionStatus::Exercised => "Exercised",
		}
	}
}

impl FromStr for PositionStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"" | "open" | "abierta" => Ok(PositionStatus::Open),
			"closed" | "cerrada" => Ok(PositionStatus::Closed),
			"rolled" => Ok(PositionStatus::Rolled),
			"assigned" | "asignada" => Ok(PositionStatus::Assigned),
			"exercised" | "ejercitada" => Ok(PositionStatus::Exercised),
			other => Err(format!("unknown position status '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LegStatus {
	#[default]
	Open,
	Closed,
	Assigned,
	Exercised,
}

impl LegStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			LegStatus::Open => "Open",
			LegStatus::Closed => "Closed",
			LegStatus::Assigned => "Assigned",
			LegStatus::Exercised => "Exercised",
		}
	}

	/// Closed, assigned and exercised legs have realized their P&L.
	pub fn is_settled(&self) -> bool {
		!matches!(self, LegStatus::Open)
	}
}

impl FromStr for LegStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"" | "open" | "abierta" => Ok(LegStatus::Open),
			"closed" | "cerrada" => Ok(LegStatus::Closed),
			"assigned" | "asignada" => Ok(LegStatus::Assigned),
			"exercised" | "ejercitada" => Ok(LegStatus::Exercised),
			other => Err(format!("unknown leg status '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptionType {
	#[default]
	Call,
	Put,
}

impl OptionType {
	pub fn as_str(&self) -> &'static str {
		match self {
			OptionType::Call => "Call",
			OptionType::Put => "Put",
		}
	}
}

impl FromStr for OptionType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"" | "call" | "c" => Ok(OptionType::Call),
			"put" | "p" => Ok(OptionType::Put),
			other => Err(format!("unknown option type '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
	Buy,
	#[default]
	Sell,
}

impl Action {
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Buy => "Buy",
			Action::Sell => "Sell",
		}
	}

	pub fn opposite(&self) -> Action {
		match self {
			Action::Buy => Action::Sell,
			Action::Sell => Action::Buy,
		}
	}
}

impl FromStr for Action {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"buy" | "compra" => Ok(Action::Buy),
			"" | "sell" | "venta" => Ok(Action::Sell),
			other => Err(format!("unknown action '{}'", other)),
		}
	}
}

macro_rules! string_enum_conversions {
	($($ty:ty),*) => {
		$(
			impl fmt::Display for $ty {
				fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
					f.write_str(self.as_str())
				}
			}

			impl TryFrom<String> for $ty {
				type Error = String;

				fn try_from(value: String) -> Result<Self, Self::Error> {
					value.parse()
				}
			}

			impl From<$ty> for String {
				fn from(value: $ty) -> String {
					value.as_str().to_string()
				}
			}
		)*
	};
}

string_enum_conversions!(PositionStatus, LegStatus, OptionType, Action);

// Lenient scalar decoding: older journals stored some numeric fields as JSON
// numbers and others as strings.

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
	Text(String),
	Int(i64),
	Float(f64),
	Bool(bool),
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
	Ok(match Option::<Scalar>::deserialize(d)? {
		Some(Scalar::Text(s)) => s,
		Some(Scalar::Int(i)) => i.to_string(),
		Some(Scalar::Float(f)) => f.to_string(),
		Some(Scalar::Bool(b)) => b.to_string(),
		None => String::new(),
	})
}

fn lenient_shares<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
	let n = match Option::<Scalar>::deserialize(d)? {
		Some(Scalar::Text(s)) => parse_decimal(&s),
		Some(Scalar::Int(i)) => i as f64,
		Some(Scalar::Float(f)) => f,
		Some(Scalar::Bool(_)) | None => 0.0,
	};
	Ok(if n.is_finite() && n > 0.0 { n as u64 } else { 0 })
}

fn lenient_width<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
	Ok(match Option::<Scalar>::deserialize(d)? {
		Some(Scalar::Text(s)) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
		Some(Scalar::Int(i)) => Some(i as f64),
		Some(Scalar::Float(f)) => Some(f),
		_ => None,
	})
	.map(|w| w.filter(|w| *w > 0.0))
}

/// Group leg indices; negative, fractional or non-numeric entries are dropped.
fn lenient_indices<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<usize>, D::Error> {
	let items = Option::<Vec<Option<Scalar>>>::deserialize(d)?.unwrap_or_default();
	Ok(items
		.into_iter()
		.filter_map(|item| match item? {
			Scalar::Int(i) => usize::try_from(i).ok(),
			Scalar::Float(f) if f >= 0.0 && f.fract() == 0.0 => Some(f as usize),
			Scalar::Text(s) => s.trim().parse::<usize>().ok(),
			_ => None,
		})
		.collect())
}

fn default_strategy() -> String {
	DEFAULT_STRATEGY.to_string()
}

fn default_lead_hours() -> u32 {
	DEFAULT_ALERT_LEAD_HOURS
}

/// Parses a stored decimal string; blank or malformed text reads as zero.
pub fn parse_decimal(s: &str) -> f64 {
	s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Renders a number the way stored decimal strings are written (no trailing zeros).
pub fn format_decimal(v: f64) -> String {
	if v.fract() == 0.0 && v.abs() < 1e15 {
		format!("{}", v as i64)
	} else {
		let s = format!("{:.8}", v);
		s.trim_end_matches('0').trim_end_matches('.').to_string()
	}
}

// Journal records

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Leg {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub ticker: String,
	#[serde(default)]
	pub option_type: OptionType,
	#[serde(default)]
	pub action: Action,
	#[serde(default, deserialize_with = "string_or_number")]
	pub strike: String,
	#[serde(default)]
	pub expiry: String,
	#[serde(default, deserialize_with = "string_or_number")]
	pub premium: String,
	#[serde(default, deserialize_with = "string_or_number")]
	pub contracts: String,
	#[serde(default)]
	pub underlying: String,
	#[serde(default, deserialize_with = "string_or_number")]
	pub fees: String,
	#[serde(default)]
	pub open_date: String,
	#[serde(default)]
	pub close_date: String,
	#[serde(default)]
	pub status: LegStatus,
	#[serde(default, deserialize_with = "string_or_number")]
	pub pl: String,
	#[serde(default)]
	pub notes: String,
	#[serde(default, deserialize_with = "lenient_width", skip_serializing_if = "Option::is_none")]
	pub width: Option<f64>,
}

impl Leg {
	pub fn strike_value(&self) -> f64 {
		parse_decimal(&self.strike)
	}

	pub fn premium_value(&self) -> f64 {
		parse_decimal(&self.premium)
	}

	pub fn contracts_value(&self) -> f64 {
		parse_decimal(&self.contracts)
	}

	pub fn fees_value(&self) -> f64 {
		parse_decimal(&self.fees)
	}

	pub fn pl_value(&self) -> f64 {
		parse_decimal(&self.pl)
	}

	pub fn is_open(&self) -> bool {
		self.status == LegStatus::Open
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default, deserialize_with = "lenient_indices")]
	pub legs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default = "default_strategy")]
	pub strategy: String,
	#[serde(default)]
	pub open_date: String,
	#[serde(default)]
	pub close_date: String,
	#[serde(default)]
	pub status: PositionStatus,
	#[serde(default, deserialize_with = "string_or_number")]
	pub cost_basis: String,
	#[serde(default, deserialize_with = "lenient_shares")]
	pub shares: u64,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub notes: String,
	#[serde(default)]
	pub tax_country: String,
	#[serde(default)]
	pub account_type: String,
	#[serde(default)]
	pub legs: Vec<Leg>,
	#[serde(default)]
	pub groups: Vec<Group>,
}

impl Default for Position {
	fn default() -> Self {
		Self {
			id: String::new(),
			title: String::new(),
			strategy: default_strategy(),
			open_date: String::new(),
			close_date: String::new(),
			status: PositionStatus::Open,
			cost_basis: String::new(),
			shares: 0,
			tags: Vec::new(),
			notes: String::new(),
			tax_country: String::new(),
			account_type: String::new(),
			legs: Vec::new(),
			groups: Vec::new(),
		}
	}
}

impl Position {
	/// Strategy used for grouping and reports; blank strategies read as "(mixta)".
	pub fn strategy_label(&self) -> &str {
		let s = self.strategy.trim();
		if s.is_empty() { DEFAULT_STRATEGY } else { s }
	}

	pub fn cost_basis_value(&self) -> f64 {
		parse_decimal(&self.cost_basis)
	}

	/// Adds a tag unless an equal one (case-insensitive, trimmed) is present.
	pub fn add_tag(&mut self, tag: &str) {
		let t = tag.trim();
		if t.is_empty() {
			return;
		}
		if !self.tags.iter().any(|x| x.trim().eq_ignore_ascii_case(t)) {
			self.tags.push(t.to_string());
		}
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		let t = tag.trim();
		self.tags.iter().any(|x| x.trim().eq_ignore_ascii_case(t))
	}
}

// Saved views and filters

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionFilter {
	#[serde(default)]
	pub q: String,
	/// "all" or a position status label.
	#[serde(default = "default_status_filter")]
	pub status: String,
	#[serde(default)]
	pub tag: String,
	#[serde(default)]
	pub from: String,
	#[serde(default)]
	pub to: String,
}

fn default_status_filter() -> String {
	"all".to_string()
}

impl Default for PositionFilter {
	fn default() -> Self {
		Self {
			q: String::new(),
			status: default_status_filter(),
			tag: String::new(),
			from: String::new(),
			to: String::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedView {
	pub name: String,
	#[serde(default)]
	pub filters: PositionFilter,
}

// Persisted state

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalState {
	#[serde(default)]
	pub positions: Vec<Position>,
	#[serde(default)]
	pub views: Vec<SavedView>,
	#[serde(default = "default_lead_hours")]
	pub alert_lead_hours: u32,
}

impl Default for JournalState {
	fn default() -> Self {
		Self {
			positions: Vec::new(),
			views: Vec::new(),
			alert_lead_hours: DEFAULT_ALERT_LEAD_HOURS,
		}
	}
}

// Settings

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalSettings {
	#[serde(default = "default_database_path")]
	pub database_path: String,
	#[serde(default = "default_preset")]
	pub default_preset: String,
	#[serde(default = "default_lead_hours")]
	pub alert_lead_hours: u32,
	#[serde(default = "default_tax_country")]
	pub default_tax_country: String,
	#[serde(default = "default_account_type")]
	pub default_account_type: String,
	#[serde(default)]
	pub seed_dedupe_from_existing: bool,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

fn default_database_path() -> String {
	"database".to_string()
}

fn default_preset() -> String {
	"auto".to_string()
}

fn default_tax_country() -> String {
	"CA".to_string()
}

fn default_account_type() -> String {
	"Margin".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

impl Default for JournalSettings {
	fn default() -> Self {
		Self {
			database_path: default_database_path(),
			default_preset: default_preset(),
			alert_lead_hours: DEFAULT_ALERT_LEAD_HOURS,
			default_tax_country: default_tax_country(),
			default_account_type: default_account_type(),
			seed_dedupe_from_existing: false,
			log_level: default_log_level(),
		}
	}
}
