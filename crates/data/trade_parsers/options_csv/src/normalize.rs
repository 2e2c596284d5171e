use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use models::{format_decimal, OptionType};
use regex::Regex;
use serde::Serialize;

fn euro_grouping() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(\.\d{3})+,\d+$").expect("valid regex"))
}

fn us_grouping() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid regex"))
}

/// Rewrites a locale-formatted number to dot-decimal form.
///
/// `1.234,56` and `1,234.56` both become `1234.56`; a lone comma is taken as
/// the decimal separator (`12,5` -> `12.5`). Anything else is returned
/// without whitespace but otherwise unchanged.
pub fn normalize_number_string(raw: &str) -> String {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if euro_grouping().is_match(&s) {
        return s.replace('.', "").replace(',', ".");
    }
    if us_grouping().is_match(&s) {
        return s.replace(',', "");
    }
    if s.contains(',') && !s.contains('.') {
        return s.replacen(',', ".", 1);
    }
    s
}

/// Numeric value of a cell, 0 when nothing parseable remains.
pub fn value_num(raw: &str) -> f64 {
    let cleaned: String = normalize_number_string(raw)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn iso_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid regex"))
}

fn day_month_name_year() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[-\s]([A-Za-z]{3,})[-\s](\d{4})").expect("valid regex"))
}

fn month_number(name: &str) -> &'static str {
    let key: String = name.chars().take(3).collect::<String>().to_lowercase();
    match key.as_str() {
        "jan" => "01",
        "feb" => "02",
        "mar" => "03",
        "apr" => "04",
        "may" => "05",
        "jun" => "06",
        "jul" => "07",
        "aug" => "08",
        "sep" => "09",
        "oct" => "10",
        "nov" => "11",
        "dec" => "12",
        _ => "01",
    }
}

/// Two-digit years at or above this are 19xx.
const CENTURY_PIVOT: u32 = 70;

fn expand_year(yy: &str) -> String {
    match yy.parse::<u32>() {
        Ok(y) if y >= CENTURY_PIVOT => format!("19{}", yy),
        _ => format!("20{}", yy),
    }
}

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%m-%d-%y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%m-%d-%Y %H:%M:%S", "%m-%d-%Y %H:%M"];

/// Coerces broker date text to `YYYY-MM-DD`; empty when unrecognized.
pub fn normalize_date(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        if s.starts_with("20") {
            return format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8]);
        }
        return format!("{}-{}-{}", expand_year(&s[0..2]), &s[2..4], &s[4..6]);
    }

    let s = s.replace('/', "-");

    if let Some(caps) = day_month_name_year().captures(&s) {
        let day = format!("{:0>2}", &caps[1]);
        return format!("{}-{}-{}", &caps[3], month_number(&caps[2]), day);
    }

    if iso_prefix().is_match(&s) {
        return s[..10].to_string();
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&s, fmt) {
            return d.format("%Y-%m-%d").to_string();
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }

    String::new()
}

/// Decoded OCC option symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccSymbol {
    pub ticker: String,
    pub option_type: OptionType,
    pub expiry: String,
    pub strike: String,
}

fn occ_long_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z.]{1,6})\s+(\d{8})([CP])(\d{8})$").expect("valid regex"))
}

fn occ_short_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z.]{1,6})\s+(\d{6})([CP])(\d{8})$").expect("valid regex"))
}

/// Decodes `ROOT  YYYYMMDD[C|P]SSSSSSSS` or the `YYMMDD` variant.
/// The eight strike digits carry three implied decimals.
pub fn decode_occ(raw: &str) -> Option<OccSymbol> {
    let s = raw.to_uppercase().split_whitespace().collect::<Vec<_>>().join(" ");
    if s.is_empty() {
        return None;
    }

    let (caps, expiry) = if let Some(c) = occ_long_date().captures(&s) {
        let d = &c[2];
        let expiry = format!("{}-{}-{}", &d[0..4], &d[4..6], &d[6..8]);
        (c, expiry)
    } else if let Some(c) = occ_short_date().captures(&s) {
        let d = &c[2];
        let expiry = format!("{}-{}-{}", expand_year(&d[0..2]), &d[2..4], &d[4..6]);
        (c, expiry)
    } else {
        return None;
    };

    let option_type = if &caps[3] == "P" { OptionType::Put } else { OptionType::Call };
    let scaled: u64 = caps[4].parse().ok()?;

    Some(OccSymbol {
        ticker: caps[1].to_string(),
        option_type,
        expiry,
        strike: format_decimal(scaled as f64 / 1000.0),
    })
}

fn call_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)call|c\b").expect("valid regex"))
}

/// Reads Call/Put from free text such as `PUT`, `C`, `Call option`.
pub fn parse_option_type(raw: &str) -> Option<OptionType> {
    let lower = raw.to_lowercase();
    if lower.contains("put") && !lower.contains("call") {
        return Some(OptionType::Put);
    }
    if call_word().is_match(&lower) {
        return Some(OptionType::Call);
    }
    if lower.contains('p') && !lower.contains('c') {
        return Some(OptionType::Put);
    }
    None
}
