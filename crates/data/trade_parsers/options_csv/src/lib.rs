//! Broker options-trade CSV import.
//!
//! Pipeline per file: [`tokenizer`] splits the text, [`presets`] maps headers
//! onto canonical fields, [`mapper`] turns each row into a leg with the help of
//! [`normalize`] and [`action`], and [`import`] merges legs into positions by
//! title with a dedup guard shared across the batch.

pub mod action;
pub mod error;
pub mod import;
pub mod mapper;
pub mod normalize;
pub mod presets;
pub mod tester;
pub mod tokenizer;

pub const PARSER_NAME: &str = "options_csv";

pub use crate::action::{classify_action, Classification};
pub use crate::error::ImportError;
pub use crate::import::{
    import_files, import_paths, BatchSummary, FileImport, FileOutcome, FileReport, ImportOptions,
    ImportSession, SourceFile, IMPORT_TAG,
};
pub use crate::mapper::{CanonicalRow, MappingReport};
pub use crate::normalize::{decode_occ, normalize_date, normalize_number_string, value_num, OccSymbol};
pub use crate::presets::{detect_preset, CanonicalField, FieldMapping, PresetSelection, PRESETS};
pub use crate::tester::{preview_csv, CsvPreview};
pub use crate::tokenizer::{parse_csv, ParsedCsv};
