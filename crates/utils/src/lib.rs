pub mod combos;
pub mod database;
pub mod ids;
pub mod positions;

use chrono::Local;

// Re-export commonly used items
pub use crate::combos::{create_groups, detect_spreads, refresh_combos};
pub use crate::database::{
    backup_payload, load_journal, merge_positions_with_deduplication, parse_backup, read_state,
    resolve_database_path, write_state, BackupPayload, JsonFileRepository, LoadedJournal,
    MemoryRepository, MergeStats, Repository,
};
pub use crate::ids::{make_hash, make_id, make_unique_id};
pub use crate::positions::LegOpError;

/// Today's local date as `YYYY-MM-DD`.
pub fn today_iso() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}
