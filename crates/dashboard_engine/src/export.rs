use std::io::Write;

use chrono::NaiveDate;
use models::{format_decimal, Position};
use thiserror::Error;
use utils::backup_payload;

use crate::metrics::dte;

pub const EXPORT_HEADERS: [&str; 29] = [
    "position_id",
    "position_title",
    "strategy",
    "pos_status",
    "open_date",
    "close_date",
    "cost_basis",
    "shares",
    "tags",
    "tax_country",
    "account_type",
    "group_count",
    "leg_id",
    "ticker",
    "option_type",
    "action",
    "strike",
    "expiry",
    "DTE",
    "premium",
    "contracts",
    "underlying",
    "fees",
    "leg_status",
    "pl",
    "leg_open_date",
    "leg_close_date",
    "notes",
    "width",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row per leg; positions without legs produce no rows.
pub fn export_rows(positions: &[Position], today: NaiveDate) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for p in positions {
        let group_count = p.groups.len().to_string();
        for l in &p.legs {
            rows.push(vec![
                p.id.clone(),
                p.title.clone(),
                p.strategy.clone(),
                p.status.to_string(),
                p.open_date.clone(),
                p.close_date.clone(),
                p.cost_basis.clone(),
                p.shares.to_string(),
                p.tags.join("|"),
                p.tax_country.clone(),
                p.account_type.clone(),
                group_count.clone(),
                l.id.clone(),
                l.ticker.clone(),
                l.option_type.to_string(),
                l.action.to_string(),
                l.strike.clone(),
                l.expiry.clone(),
                dte(&l.expiry, today).map(|d| d.to_string()).unwrap_or_default(),
                l.premium.clone(),
                l.contracts.clone(),
                l.underlying.clone(),
                l.fees.clone(),
                l.status.to_string(),
                l.pl.clone(),
                l.open_date.clone(),
                l.close_date.clone(),
                l.notes.clone(),
                l.width.map(format_decimal).unwrap_or_default(),
            ]);
        }
    }
    rows
}

pub fn write_positions_csv<W: Write>(
    writer: W,
    positions: &[Position],
    today: NaiveDate,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADERS)?;
    for row in export_rows(positions, today) {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv_string(positions: &[Position], today: NaiveDate) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_positions_csv(&mut buf, positions, today)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Pretty JSON backup document (`{version, exported_at, positions}`).
pub fn export_backup_json(positions: &[Position]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&backup_payload(positions))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::parse_iso;
    use models::Leg;

    fn sample() -> Vec<Position> {
        vec![
            Position {
                id: "p1".to_string(),
                title: "IC, SPY \"weekly\"".to_string(),
                tags: vec!["a".to_string(), "b".to_string()],
                legs: vec![Leg {
                    id: "l1".to_string(),
                    ticker: "SPY".to_string(),
                    expiry: "2025-10-17".to_string(),
                    width: Some(5.0),
                    ..Default::default()
                }],
                ..Default::default()
            },
            Position {
                id: "empty".to_string(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_csv_export_quotes_and_columns() {
        let today = parse_iso("2025-10-10").unwrap();
        let csv = export_csv_string(&sample(), today).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("position_id,position_title,strategy"));
        assert!(lines[0].ends_with("notes,width"));
        assert!(lines[1].starts_with("p1,\"IC, SPY \"\"weekly\"\"\",(mixta),Open"));
        assert!(lines[1].contains(",a|b,"));
        assert!(lines[1].contains(",2025-10-17,7,"));
        assert!(lines[1].ends_with(",5"));
    }

    #[test]
    fn test_backup_json_round_trips() {
        let json = export_backup_json(&sample()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["version"], 1);
        assert_eq!(v["positions"].as_array().unwrap().len(), 2);
        assert_eq!(utils::parse_backup(&json).unwrap().len(), 2);
    }
}
