use models::{format_decimal, Leg, LegStatus, OptionType};
use serde::Serialize;

use crate::action::{classify_action, Classification};
use crate::error::ImportError;
use crate::normalize::{decode_occ, normalize_date, normalize_number_string, parse_option_type, value_num};
use crate::presets::{detect_preset, CanonicalField, FieldMapping, PresetSelection};
use crate::tokenizer::ParsedCsv;

/// Title used when a row carries neither a title, ticker nor option symbol.
pub const FALLBACK_TITLE: &str = "Import CSV";

/// How one file's headers were resolved.
#[derive(Debug, Clone)]
pub struct MappingReport {
    pub requested: PresetSelection,
    pub detected: Option<&'static str>,
    pub mapping: FieldMapping,
    pub missing: Vec<CanonicalField>,
}

impl MappingReport {
    pub fn resolve(csv: &ParsedCsv, requested: PresetSelection) -> Self {
        let detected = detect_preset(&csv.norm_headers).map(|p| p.key);
        let mapping = FieldMapping::build(requested, &csv.norm_headers);
        let missing = mapping.missing_required();
        Self {
            requested,
            detected,
            mapping,
            missing,
        }
    }

    /// Preset name recorded on imported positions. An explicitly named
    /// preset wins; under `auto` it is the detected one.
    pub fn preset_label(&self) -> &'static str {
        match self.requested {
            PresetSelection::Named(p) => p.key,
            PresetSelection::Auto => self.detected.unwrap_or("auto"),
        }
    }

    pub fn ensure_complete(&self) -> Result<(), ImportError> {
        if self.missing.is_empty() {
            return Ok(());
        }
        Err(ImportError::MissingColumns {
            preset: self.requested.key().to_string(),
            detected: self.detected.map(str::to_string),
            missing: self.missing.iter().map(|f| f.as_str().to_string()).collect(),
        })
    }

    /// `(field, header)` pairs for every canonical field.
    pub fn describe(&self, csv: &ParsedCsv) -> Vec<(CanonicalField, Option<String>)> {
        CanonicalField::ALL
            .into_iter()
            .map(|f| (f, self.mapping.column(f).and_then(|i| csv.headers.get(i).cloned())))
            .collect()
    }
}

/// One data row with every canonical field resolved and normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRow {
    pub title: String,
    pub ticker: String,
    pub option_type: Option<OptionType>,
    pub strike: String,
    pub expiry: String,
    pub classification: Classification,
    pub quantity: f64,
    pub contracts: f64,
    pub premium: String,
    pub fees: String,
    pub pl: String,
    pub open_date: String,
    pub close_date: String,
    pub notes: String,
    pub option_symbol: String,
}

fn cell<'a>(row: &'a [String], mapping: &FieldMapping, field: CanonicalField) -> &'a str {
    mapping
        .column(field)
        .and_then(|i| row.get(i))
        .map(|s| s.trim())
        .unwrap_or("")
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|s| !s.is_empty())
}

impl CanonicalRow {
    pub fn from_cells(row: &[String], report: &MappingReport) -> Self {
        let m = &report.mapping;
        let get = |field: CanonicalField| cell(row, m, field);
        let option_symbol = m
            .option_symbol
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("");

        let title = first_non_empty(&[get(CanonicalField::Title), get(CanonicalField::Ticker), option_symbol])
            .unwrap_or(FALLBACK_TITLE)
            .to_string();

        let mut ticker = get(CanonicalField::Ticker).to_uppercase();
        let mut option_type = parse_option_type(get(CanonicalField::OptionType));
        let mut strike = normalize_number_string(get(CanonicalField::Strike));
        let mut expiry = normalize_date(get(CanonicalField::Expiry));

        // A ticker column that resolved onto the option symbol itself.
        if let Some(occ) = decode_occ(&ticker) {
            ticker = occ.ticker;
        }

        let incomplete = ticker.is_empty() || option_type.is_none() || strike.is_empty() || expiry.is_empty();
        if incomplete && !option_symbol.is_empty() {
            if let Some(occ) = decode_occ(option_symbol) {
                if ticker.is_empty() {
                    ticker = occ.ticker;
                }
                if option_type.is_none() {
                    option_type = Some(occ.option_type);
                }
                if strike.is_empty() {
                    strike = occ.strike;
                }
                if expiry.is_empty() {
                    expiry = occ.expiry;
                }
            }
        }

        let raw_qty = m
            .column(CanonicalField::Contracts)
            .map(|_| get(CanonicalField::Contracts))
            .unwrap_or("1");
        let quantity = value_num(raw_qty);
        let contracts = if quantity == 0.0 { 1.0 } else { quantity.abs() };

        let classification = classify_action(get(CanonicalField::Action), quantity, get(CanonicalField::OpenClose));

        let fees = normalize_number_string(get(CanonicalField::Fees));

        Self {
            title,
            ticker,
            option_type,
            strike,
            expiry,
            classification,
            quantity,
            contracts,
            premium: normalize_number_string(get(CanonicalField::Premium)),
            fees: if fees.is_empty() { "0".to_string() } else { fees },
            pl: normalize_number_string(get(CanonicalField::Pl)),
            open_date: normalize_date(get(CanonicalField::OpenDate)),
            close_date: normalize_date(get(CanonicalField::CloseDate)),
            notes: get(CanonicalField::Notes).to_string(),
            option_symbol: option_symbol.to_string(),
        }
    }

    /// Identity of an execution within a batch:
    /// `TICKER|type|action|OPEN/CLOSE|strike|expiry|open_date|premium|qty`.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.ticker,
            self.option_type.map(|t| t.as_str()).unwrap_or(""),
            self.classification.action,
            if self.classification.is_close { "CLOSE" } else { "OPEN" },
            self.strike,
            self.expiry,
            self.open_date,
            self.premium,
            format_decimal(self.contracts),
        )
    }

    pub fn to_leg(&self, id: String, today: &str) -> Leg {
        let open_date = if self.open_date.is_empty() {
            today.to_string()
        } else {
            self.open_date.clone()
        };

        let (status, close_date) = if self.classification.is_close {
            let raw = first_non_empty(&[self.close_date.as_str(), self.open_date.as_str()]).unwrap_or(today);
            (LegStatus::Closed, raw.to_string())
        } else {
            (LegStatus::Open, String::new())
        };

        let notes = if self.notes.is_empty() {
            self.option_symbol.clone()
        } else {
            self.notes.clone()
        };

        Leg {
            id,
            ticker: self.ticker.clone(),
            option_type: self.option_type.unwrap_or_default(),
            action: self.classification.action,
            strike: self.strike.clone(),
            expiry: self.expiry.clone(),
            premium: self.premium.clone(),
            contracts: format_decimal(self.contracts),
            underlying: String::new(),
            fees: self.fees.clone(),
            open_date,
            close_date,
            status,
            pl: self.pl.clone(),
            notes,
            width: None,
        }
    }
}
