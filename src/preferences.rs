//! Reader preferences behind an injected key-value store.
//!
//! Only two values are persisted: the reading mode and whether the header is
//! hidden. Values are stored JSON-encoded (`"single"`, `true`) so any string
//! store can back them. Failures to read or write are logged and never block
//! reading.

use crate::config::ReadingMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const READING_MODE_KEY: &str = "reader_reading_mode";
pub const HEADER_HIDDEN_KEY: &str = "reader_header_hidden";

/// Minimal string key-value capability used by the session.
pub trait PreferenceStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str) -> Result<()>;
}

/// Non-persistent store; useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: HashMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a small TOML file; every `set` rewrites the file.
#[derive(Debug, Clone)]
pub struct TomlPreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Default)]
struct PreferencesFile {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

impl TomlPreferences {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(data) => match toml::from_str::<PreferencesFile>(&data) {
                Ok(file) => file.values,
                Err(err) => {
                    warn!(path = %path.display(), "Ignoring malformed preferences file: {err}");
                    BTreeMap::new()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No stored preferences yet");
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let contents = toml::to_string(&PreferencesFile {
            values: self.values.clone(),
        })
        .context("failed to encode preferences")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl PreferenceStore for TomlPreferences {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.values.insert(name.to_string(), value.to_string());
        self.flush()
    }
}

/// Stored reading mode, or `fallback` when absent or unreadable.
pub fn load_reading_mode(store: &dyn PreferenceStore, fallback: ReadingMode) -> ReadingMode {
    load_value(store, READING_MODE_KEY).unwrap_or(fallback)
}

/// Stored header flag; the header is visible unless stored otherwise.
pub fn load_header_hidden(store: &dyn PreferenceStore) -> bool {
    load_value(store, HEADER_HIDDEN_KEY).unwrap_or(false)
}

pub fn save_reading_mode(store: &mut dyn PreferenceStore, mode: ReadingMode) {
    save_value(store, READING_MODE_KEY, &mode);
}

pub fn save_header_hidden(store: &mut dyn PreferenceStore, hidden: bool) {
    save_value(store, HEADER_HIDDEN_KEY, &hidden);
}

fn load_value<T: for<'de> Deserialize<'de>>(store: &dyn PreferenceStore, name: &str) -> Option<T> {
    let raw = store.get(name)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%name, %raw, "Failed to decode stored preference: {err}");
            None
        }
    }
}

fn save_value<T: Serialize>(store: &mut dyn PreferenceStore, name: &str, value: &T) {
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(%name, "Failed to encode preference: {err}");
            return;
        }
    };
    if let Err(err) = store.set(name, &encoded) {
        warn!(%name, "Failed to persist preference: {err:#}");
    } else {
        debug!(%name, value = %encoded, "Persisted preference");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_prefs_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir()
            .join(format!("aphrodite-reader-{tag}-{}-{nanos}", std::process::id()))
            .join("preferences.toml")
    }

    #[test]
    fn defaults_apply_when_nothing_is_stored() {
        let store = MemoryPreferences::new();
        assert_eq!(load_reading_mode(&store, ReadingMode::Vertical), ReadingMode::Vertical);
        assert!(!load_header_hidden(&store));
    }

    #[test]
    fn values_are_json_encoded() {
        let mut store = MemoryPreferences::new();
        save_reading_mode(&mut store, ReadingMode::Double);
        save_header_hidden(&mut store, true);

        assert_eq!(store.get(READING_MODE_KEY).as_deref(), Some("\"double\""));
        assert_eq!(store.get(HEADER_HIDDEN_KEY).as_deref(), Some("true"));
        assert_eq!(load_reading_mode(&store, ReadingMode::Vertical), ReadingMode::Double);
        assert!(load_header_hidden(&store));
    }

    #[test]
    fn malformed_values_fall_back() {
        let mut store = MemoryPreferences::new();
        store.set(READING_MODE_KEY, "sideways").unwrap();
        store.set(HEADER_HIDDEN_KEY, "\"yes\"").unwrap();

        assert_eq!(load_reading_mode(&store, ReadingMode::Single), ReadingMode::Single);
        assert!(!load_header_hidden(&store));
    }

    #[test]
    fn toml_store_survives_reopen() {
        let path = temp_prefs_path("reopen");
        let mut store = TomlPreferences::open(&path);
        save_reading_mode(&mut store, ReadingMode::Single);
        save_header_hidden(&mut store, true);

        let reopened = TomlPreferences::open(&path);
        assert_eq!(load_reading_mode(&reopened, ReadingMode::Vertical), ReadingMode::Single);
        assert!(load_header_hidden(&reopened));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn toml_store_ignores_garbage_file() {
        let path = temp_prefs_path("garbage");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not = [valid").unwrap();

        let store = TomlPreferences::open(&path);
        assert_eq!(store.get(READING_MODE_KEY), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
