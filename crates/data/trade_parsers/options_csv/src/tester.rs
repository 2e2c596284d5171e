//! Dry look at how a file would import, without touching any journal.

use models::Leg;
use serde::Serialize;

use crate::error::ImportError;
use crate::mapper::{CanonicalRow, MappingReport};
use crate::presets::PresetSelection;
use crate::tokenizer::parse_csv;

pub const PREVIEW_ROWS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedColumn {
    pub field: &'static str,
    pub header: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub title: String,
    /// e.g. `Sell/Open`
    pub action: String,
    pub leg: Leg,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvPreview {
    pub requested: &'static str,
    pub detected: Option<&'static str>,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub mapping: Vec<MappedColumn>,
    pub option_symbol: Option<String>,
    pub missing: Vec<&'static str>,
    pub total_rows: usize,
    pub rows: Vec<PreviewRow>,
}

impl CsvPreview {
    pub fn is_importable(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Resolves headers and normalizes the first [`PREVIEW_ROWS`] rows.
/// Missing columns are reported, not raised.
pub fn preview_csv(text: &str, selection: PresetSelection, today: &str) -> Result<CsvPreview, ImportError> {
    let csv = parse_csv(text)?;
    let report = MappingReport::resolve(&csv, selection);

    let rows = csv
        .rows
        .iter()
        .take(PREVIEW_ROWS)
        .enumerate()
        .map(|(i, cells)| {
            let row = CanonicalRow::from_cells(cells, &report);
            PreviewRow {
                title: row.title.clone(),
                action: row.classification.label(),
                leg: row.to_leg(format!("preview-{}", i + 1), today),
            }
        })
        .collect();

    let mapping = report
        .describe(&csv)
        .into_iter()
        .map(|(field, header)| MappedColumn {
            field: field.as_str(),
            header,
        })
        .collect();

    Ok(CsvPreview {
        requested: selection.key(),
        detected: report.detected,
        delimiter: csv.delimiter,
        option_symbol: report.mapping.option_symbol.and_then(|i| csv.headers.get(i).cloned()),
        headers: csv.headers.clone(),
        mapping,
        missing: report.missing.iter().map(|f| f.as_str()).collect(),
        total_rows: csv.rows.len(),
        rows,
    })
}
