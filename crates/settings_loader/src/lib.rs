//! # Settings Loader
//!
//! Centralized settings loading for the options journal binaries. Settings live
//! in a `settings.json` file next to the journal database and hold the default
//! import preset, the database location, the expiry alert lead time and the
//! metadata stamped on positions created by imports.
//!
//! Every field has a default, so a partial file is valid and a missing file
//! falls back to [`JournalSettings::default`].
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/settings.json")?;
//!
//! // Explicit path first, then ./settings.json, then built-in defaults
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_settings_or_default(path.as_ref());
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
pub use models::JournalSettings;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<JournalSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: JournalSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from the default location (settings.json in the current directory)
pub fn load_default_settings() -> Result<JournalSettings> {
    load_settings(DEFAULT_SETTINGS_FILE)
}

/// Tries the provided path, then the default location. Returns None only if no
/// readable settings file is found anywhere.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Option<JournalSettings> {
    if let Some(settings_path) = path {
        match load_settings(settings_path) {
            Ok(settings) => return Some(settings),
            Err(e) => {
                tracing::warn!("{:#}; trying {}", e, DEFAULT_SETTINGS_FILE);
            }
        }
    }

    load_default_settings().ok()
}

/// Same as [`load_settings_with_fallback`] but never fails: built-in defaults
/// are used when no file can be read.
pub fn load_settings_or_default(path: Option<&PathBuf>) -> JournalSettings {
    load_settings_with_fallback(path).unwrap_or_else(|| {
        tracing::debug!("no settings file found, using defaults");
        JournalSettings::default()
    })
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}
