use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::Result;
use models::{JournalSettings, Leg, LegStatus, Position};
use serde::Serialize;
use tracing::{debug, info, warn};
use utils::positions::{create_position, new_leg_id, NewPosition};
use utils::{refresh_combos, today_iso, MergeStats, Repository};

use crate::error::ImportError;
use crate::mapper::{CanonicalRow, MappingReport};
use crate::presets::PresetSelection;
use crate::tokenizer::parse_csv;

pub const IMPORT_TAG: &str = "import_csv";

/// Defaults stamped on positions created by an import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub tax_country: String,
    pub account_type: String,
    /// Rebuild the dedup set from legs already in the journal, so a repeated
    /// batch adds nothing.
    pub seed_dedupe_from_existing: bool,
    /// `YYYY-MM-DD` used when a row carries no date.
    pub today: String,
}

impl ImportOptions {
    pub fn from_settings(settings: &JournalSettings) -> Self {
        Self {
            tax_country: settings.default_tax_country.clone(),
            account_type: settings.default_account_type.clone(),
            seed_dedupe_from_existing: settings.seed_dedupe_from_existing,
            today: today_iso(),
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_settings(&JournalSettings::default())
    }
}

/// Dedup key of a leg already in the journal.
fn stored_leg_key(leg: &Leg) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        leg.ticker,
        leg.option_type,
        leg.action,
        if leg.status == LegStatus::Closed { "CLOSE" } else { "OPEN" },
        leg.strike,
        leg.expiry,
        leg.open_date,
        leg.premium,
        leg.contracts,
    )
}

/// Counts for one successfully imported file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileImport {
    pub added: usize,
    pub skipped: usize,
    pub preset: String,
}

impl FileImport {
    pub fn stats(&self) -> MergeStats {
        MergeStats {
            added: self.added,
            skipped: self.skipped,
            total: self.added + self.skipped,
        }
    }
}

/// Position list, title index and dedup set shared by every file of one
/// batch.
#[derive(Debug, Clone)]
pub struct ImportSession {
    positions: Vec<Position>,
    title_index: HashMap<String, usize>,
    seen: HashSet<String>,
    options: ImportOptions,
}

impl ImportSession {
    pub fn new(positions: Vec<Position>, options: ImportOptions) -> Self {
        let mut title_index = HashMap::new();
        let mut seen = HashSet::new();
        for (i, p) in positions.iter().enumerate() {
            title_index.insert(p.title.clone(), i);
            if options.seed_dedupe_from_existing {
                seen.extend(p.legs.iter().map(stored_leg_key));
            }
        }
        Self {
            positions,
            title_index,
            seen,
            options,
        }
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }

    fn position_for(&mut self, row: &CanonicalRow, preset: &str) -> &mut Position {
        let idx = match self.title_index.get(&row.title) {
            Some(&i) => i,
            None => {
                let open_date = if row.open_date.is_empty() {
                    self.options.today.clone()
                } else {
                    row.open_date.clone()
                };
                let pos = create_position(
                    NewPosition {
                        title: row.title.clone(),
                        open_date,
                        tags: vec![IMPORT_TAG.to_string(), preset.to_string()],
                        tax_country: self.options.tax_country.clone(),
                        account_type: self.options.account_type.clone(),
                        ..Default::default()
                    },
                    &self.positions,
                );
                debug!("New position '{}' ({})", pos.title, pos.id);
                self.positions.push(pos);
                let i = self.positions.len() - 1;
                self.title_index.insert(row.title.clone(), i);
                i
            }
        };
        &mut self.positions[idx]
    }

    /// Imports one file's text. Fails only when required columns are
    /// missing; individual rows never fail.
    pub fn import_text(&mut self, text: &str, selection: PresetSelection) -> Result<FileImport, ImportError> {
        let csv = parse_csv(text)?;
        let report = MappingReport::resolve(&csv, selection);
        report.ensure_complete()?;

        let preset = report.preset_label();
        let mut added = 0;
        let mut skipped = 0;

        for cells in &csv.rows {
            let row = CanonicalRow::from_cells(cells, &report);
            let key = row.dedup_key();
            if !self.seen.insert(key.clone()) {
                debug!("Skipping duplicate execution {}", key);
                skipped += 1;
                continue;
            }

            let today = self.options.today.clone();
            let pos = self.position_for(&row, preset);
            let id = new_leg_id(pos, &key);
            pos.legs.push(row.to_leg(id, &today));
            refresh_combos(pos);
            added += 1;
        }

        Ok(FileImport {
            added,
            skipped,
            preset: preset.to_string(),
        })
    }
}

/// One input file, already read.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reads a file, replacing invalid UTF-8 sequences.
    pub fn read(path: &Path) -> Result<Self, ImportError> {
        let bytes = fs::read(path).map_err(|source| ImportError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            name: path.display().to_string(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Imported(FileImport),
    Failed(ImportError),
}

#[derive(Debug)]
pub struct FileReport {
    pub name: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub files: Vec<FileReport>,
    pub added: usize,
    pub skipped: usize,
    /// Preset of the first file that imported.
    pub used_preset: Option<String>,
}

impl BatchSummary {
    pub fn stats(&self) -> MergeStats {
        MergeStats {
            added: self.added,
            skipped: self.skipped,
            total: self.added + self.skipped,
        }
    }

    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed(_)))
            .count()
    }
}

fn run_batch<R: Repository>(
    repo: &mut R,
    inputs: Vec<(String, Result<String, ImportError>)>,
    selection: PresetSelection,
    options: ImportOptions,
) -> Result<BatchSummary> {
    let mut session = ImportSession::new(repo.load(), options);
    let mut summary = BatchSummary::default();

    for (name, text) in inputs {
        let outcome = match text.and_then(|t| session.import_text(&t, selection)) {
            Ok(done) => {
                info!(
                    "Imported {} ({}): {} added, {} skipped",
                    name, done.preset, done.added, done.skipped
                );
                summary.added += done.added;
                summary.skipped += done.skipped;
                if summary.used_preset.is_none() {
                    summary.used_preset = Some(done.preset.clone());
                }
                FileOutcome::Imported(done)
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                FileOutcome::Failed(e)
            }
        };
        summary.files.push(FileReport { name, outcome });
    }

    repo.save(session.positions())?;
    info!(
        "Batch done: {} files, {} added, {} skipped, {} failed",
        summary.files.len(),
        summary.added,
        summary.skipped,
        summary.failed()
    );
    Ok(summary)
}

/// Imports already-read files as one batch: one repository load, one save.
pub fn import_files<R: Repository>(
    repo: &mut R,
    files: &[SourceFile],
    selection: PresetSelection,
    options: ImportOptions,
) -> Result<BatchSummary> {
    let inputs = files.iter().map(|f| (f.name.clone(), Ok(f.text.clone()))).collect();
    run_batch(repo, inputs, selection, options)
}

/// Like [`import_files`], reading each path first. Unreadable files are
/// reported as failures and the batch continues.
pub fn import_paths<R: Repository, P: AsRef<Path>>(
    repo: &mut R,
    paths: &[P],
    selection: PresetSelection,
    options: ImportOptions,
) -> Result<BatchSummary> {
    let inputs = paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            (p.display().to_string(), SourceFile::read(p).map(|f| f.text))
        })
        .collect();
    run_batch(repo, inputs, selection, options)
}
