use anyhow::{bail, Context, Result};
use chrono::Local;
use models::{JournalState, Position, SavedView, DEFAULT_ALERT_LEAD_HOURS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::HashSet,
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use crate::ids::make_unique_id;
use crate::positions::new_leg_id;

pub const JOURNAL_FILE_NAME: &str = "journal.json";
pub const BACKUP_VERSION: u32 = 1;

/// Storage seam for the journal's positions.
///
/// `load` never fails: a missing or unreadable store reads as empty. Import
/// batches call `load` once at the start and `save` once at the end.
pub trait Repository {
    fn load(&self) -> Vec<Position>;
    fn save(&mut self, positions: &[Position]) -> Result<()>;
}

/// Resolves a database location to the journal file.
/// A directory (or a non-existent path without a `.json` suffix) resolves to
/// `journal.json` inside it.
pub fn resolve_database_path<P: AsRef<Path>>(database_path: P) -> PathBuf {
    let path = database_path.as_ref();
    if path.is_dir() || (!path.exists() && !path.to_string_lossy().ends_with(".json")) {
        path.join(JOURNAL_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Journal file as found on disk.
#[derive(Debug, Clone, Default)]
pub struct LoadedJournal {
    pub state: JournalState,
    /// Stored positions that did not decode, kept verbatim so saving writes
    /// them back instead of dropping them.
    pub unreadable: Vec<Value>,
    /// The file exists but could not be read as JSON at all.
    pub malformed: bool,
}

impl LoadedJournal {
    fn malformed() -> Self {
        Self {
            malformed: true,
            ..Default::default()
        }
    }
}

fn decode_views(raw: Option<Value>) -> Vec<SavedView> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<SavedView>(v) {
            Ok(view) => Some(view),
            Err(e) => {
                tracing::warn!("Dropping unreadable saved view: {}", e);
                None
            }
        })
        .collect()
}

/// Blank ids (hand-edited journals) get fresh ones so merges and lookups by
/// id keep working.
fn fill_missing_ids(positions: &mut [Position]) {
    for i in 0..positions.len() {
        if positions[i].id.trim().is_empty() {
            let key = format!("{}|{}|{}", positions[i].title, positions[i].open_date, i);
            let id = make_unique_id("POS", &key, |c| positions.iter().any(|p| p.id == c));
            positions[i].id = id;
        }
        let pos = &mut positions[i];
        for j in 0..pos.legs.len() {
            if pos.legs[j].id.trim().is_empty() {
                let key = format!("{}|{}", pos.legs[j].ticker, j);
                let id = new_leg_id(pos, &key);
                pos.legs[j].id = id;
            }
        }
        for k in 0..pos.groups.len() {
            if pos.groups[k].id.trim().is_empty() {
                let key = format!("{}|{}|{}", pos.id, pos.groups[k].name, k);
                let id = make_unique_id("GRP", &key, |c| pos.groups.iter().any(|g| g.id == c));
                pos.groups[k].id = id;
            }
        }
    }
}

/// Decodes a journal document record by record. A position that does not
/// match the model is set aside in `unreadable` instead of failing the load.
fn decode_journal(value: Value) -> LoadedJournal {
    let (raw_positions, mut rest) = match value {
        // Journals exported before saved views existed were a bare position list
        Value::Array(items) => (items, Map::new()),
        Value::Object(mut map) => {
            let items = match map.remove("positions") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![other],
            };
            (items, map)
        }
        _ => return LoadedJournal::malformed(),
    };

    let mut positions = Vec::with_capacity(raw_positions.len());
    let mut unreadable = Vec::new();
    for (i, raw) in raw_positions.into_iter().enumerate() {
        match serde_json::from_value::<Position>(raw.clone()) {
            Ok(pos) => positions.push(pos),
            Err(e) => {
                tracing::warn!("Journal position #{} cannot be read, keeping it untouched: {}", i + 1, e);
                unreadable.push(raw);
            }
        }
    }
    fill_missing_ids(&mut positions);

    let alert_lead_hours = rest
        .get("alert_lead_hours")
        .and_then(Value::as_u64)
        .and_then(|h| u32::try_from(h).ok())
        .unwrap_or(DEFAULT_ALERT_LEAD_HOURS);

    LoadedJournal {
        state: JournalState {
            positions,
            views: decode_views(rest.remove("views")),
            alert_lead_hours,
        },
        unreadable,
        malformed: false,
    }
}

/// Reads the journal file. Missing or blank files read as an empty journal;
/// content that is not JSON is logged and flagged as malformed.
pub fn load_journal<P: AsRef<Path>>(database_path: P) -> LoadedJournal {
    let db_path = resolve_database_path(database_path);

    let mut contents = String::new();
    match File::open(&db_path) {
        Ok(mut file) => {
            if let Err(e) = file.read_to_string(&mut contents) {
                tracing::warn!("Cannot read journal at {:?}: {}", db_path, e);
                return LoadedJournal::malformed();
            }
        }
        Err(_) => {
            tracing::debug!("No journal at {:?}, starting empty", db_path);
            return LoadedJournal::default();
        }
    }

    if contents.trim().is_empty() {
        return LoadedJournal::default();
    }

    match serde_json::from_str::<Value>(&contents) {
        Ok(value) => {
            let loaded = decode_journal(value);
            if loaded.malformed {
                tracing::warn!("Journal at {:?} is not a journal document, starting empty", db_path);
            }
            loaded
        }
        Err(e) => {
            tracing::warn!("Journal at {:?} is not valid JSON, starting empty: {}", db_path, e);
            LoadedJournal::malformed()
        }
    }
}

/// Reads the journal state. Missing files read as an empty journal; malformed
/// content is logged and also reads as empty.
pub fn read_state<P: AsRef<Path>>(database_path: P) -> JournalState {
    load_journal(database_path).state
}

fn write_document(db_path: &Path, document: &Value) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory {:?}", parent))?;
        }
    }

    let mut file = File::create(db_path)
        .with_context(|| format!("Cannot create journal file at {:?}", db_path))?;

    let formatted = serde_json::to_string_pretty(document)?;
    file.write_all(formatted.as_bytes())
        .with_context(|| format!("Cannot write journal file at {:?}", db_path))?;
    Ok(())
}

/// Writes the journal state as pretty JSON, creating parent directories.
pub fn write_state<P: AsRef<Path>>(database_path: P, state: &JournalState) -> Result<PathBuf> {
    let db_path = resolve_database_path(database_path);
    write_document(&db_path, &serde_json::to_value(state)?)?;
    Ok(db_path)
}

/// JSON file backed repository. Saving keeps the saved views and alert lead
/// time already stored in the file.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new<P: AsRef<Path>>(database_path: P) -> Self {
        Self {
            path: resolve_database_path(database_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_state(&self) -> JournalState {
        read_state(&self.path)
    }

    /// Writes `state`, appending the stored positions that could not be
    /// read. Refuses to replace a file that is not JSON.
    pub fn save_state(&self, state: &JournalState) -> Result<()> {
        let stored = load_journal(&self.path);
        if stored.malformed {
            bail!(
                "Refusing to overwrite {:?}: the stored journal is not valid JSON",
                self.path
            );
        }

        let mut document = serde_json::to_value(state)?;
        if !stored.unreadable.is_empty() {
            tracing::warn!(
                "Keeping {} unreadable position(s) in {:?}",
                stored.unreadable.len(),
                self.path
            );
            if let Some(Value::Array(items)) = document.get_mut("positions") {
                items.extend(stored.unreadable);
            }
        }
        write_document(&self.path, &document)
    }
}

impl Repository for JsonFileRepository {
    fn load(&self) -> Vec<Position> {
        self.load_state().positions
    }

    fn save(&mut self, positions: &[Position]) -> Result<()> {
        let mut state = self.load_state();
        state.positions = positions.to_vec();
        self.save_state(&state)
    }
}

/// In-memory repository, used by dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    pub positions: Vec<Position>,
    pub saves: usize,
}

impl MemoryRepository {
    pub fn new(positions: Vec<Position>) -> Self {
        Self { positions, saves: 0 }
    }
}

impl Repository for MemoryRepository {
    fn load(&self) -> Vec<Position> {
        self.positions.clone()
    }

    fn save(&mut self, positions: &[Position]) -> Result<()> {
        self.positions = positions.to_vec();
        self.saves += 1;
        Ok(())
    }
}

/// JSON backup document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupPayload {
    pub version: u32,
    pub exported_at: String,
    pub positions: Vec<Position>,
}

pub fn backup_payload(positions: &[Position]) -> BackupPayload {
    BackupPayload {
        version: BACKUP_VERSION,
        exported_at: Local::now().to_rfc3339(),
        positions: positions.to_vec(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BackupInput {
    Bare(Vec<Position>),
    Wrapped { positions: Vec<Position> },
}

/// Accepts either a backup document or a bare array of positions.
pub fn parse_backup(contents: &str) -> Result<Vec<Position>> {
    let input: BackupInput =
        serde_json::from_str(contents).context("Backup is neither a position array nor a backup document")?;
    Ok(match input {
        BackupInput::Bare(positions) => positions,
        BackupInput::Wrapped { positions } => positions,
    })
}

/// Statistics about a merge operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
}

impl MergeStats {
    pub fn has_duplicates(&self) -> bool {
        self.skipped > 0
    }
}

/// Prepends restored positions to the current ones. Positions whose `id` is
/// already present (or repeated within `restored`) are skipped.
pub fn merge_positions_with_deduplication(
    current: Vec<Position>,
    restored: Vec<Position>,
) -> (Vec<Position>, MergeStats) {
    let mut seen: HashSet<String> = current.iter().map(|p| p.id.clone()).collect();

    let mut stats = MergeStats {
        added: 0,
        skipped: 0,
        total: restored.len(),
    };

    let mut merged = Vec::with_capacity(current.len() + restored.len());
    for pos in restored {
        if seen.insert(pos.id.clone()) {
            merged.push(pos);
            stats.added += 1;
        } else {
            stats.skipped += 1;
        }
    }
    merged.extend(current);

    (merged, stats)
}
