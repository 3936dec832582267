use super::defaults;
use super::models::{AppConfig, LogLevel, ReadingMode, WorkSourceConfig};
use serde::Deserialize;

/// Section names that mark a config file as using the sectioned layout.
pub(super) const SECTION_NAMES: [&str; 5] = ["logging", "reader", "preload", "storage", "keys"];

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    reader: ReaderConfig,
    #[serde(default)]
    preload: PreloadConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    keys: KeysConfig,
    #[serde(default = "defaults::default_works")]
    works: Vec<WorkSourceConfig>,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            default_mode: tables.reader.default_mode,
            visibility_threshold: tables.reader.visibility_threshold,
            preload_next_chapter: tables.preload.enabled,
            preload_workers: tables.preload.workers,
            http_timeout_secs: tables.preload.http_timeout_secs,
            preferences_path: tables.storage.preferences_path,
            key_previous_page: tables.keys.previous_page,
            key_next_page: tables.keys.next_page,
            key_toggle_header: tables.keys.toggle_header,
            key_toggle_menu: tables.keys.toggle_menu,
            key_close_menu: tables.keys.close_menu,
            works: tables.works,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            reader: ReaderConfig {
                default_mode: config.default_mode,
                visibility_threshold: config.visibility_threshold,
            },
            preload: PreloadConfig {
                enabled: config.preload_next_chapter,
                workers: config.preload_workers,
                http_timeout_secs: config.http_timeout_secs,
            },
            storage: StorageConfig {
                preferences_path: config.preferences_path.clone(),
            },
            keys: KeysConfig {
                previous_page: config.key_previous_page.clone(),
                next_page: config.key_next_page.clone(),
                toggle_header: config.key_toggle_header.clone(),
                toggle_menu: config.key_toggle_menu.clone(),
                close_menu: config.key_close_menu.clone(),
            },
            works: config.works.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReaderConfig {
    #[serde(default)]
    default_mode: ReadingMode,
    #[serde(default = "defaults::default_visibility_threshold")]
    visibility_threshold: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            default_mode: ReadingMode::default(),
            visibility_threshold: defaults::default_visibility_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PreloadConfig {
    #[serde(default = "defaults::default_preload_next_chapter")]
    enabled: bool,
    #[serde(default = "defaults::default_preload_workers")]
    workers: usize,
    #[serde(default = "defaults::default_http_timeout_secs")]
    http_timeout_secs: u64,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        PreloadConfig {
            enabled: defaults::default_preload_next_chapter(),
            workers: defaults::default_preload_workers(),
            http_timeout_secs: defaults::default_http_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_preferences_path")]
    preferences_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            preferences_path: defaults::default_preferences_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct KeysConfig {
    #[serde(default = "defaults::default_key_previous_page")]
    previous_page: String,
    #[serde(default = "defaults::default_key_next_page")]
    next_page: String,
    #[serde(default = "defaults::default_key_toggle_header")]
    toggle_header: String,
    #[serde(default = "defaults::default_key_toggle_menu")]
    toggle_menu: String,
    #[serde(default = "defaults::default_key_close_menu")]
    close_menu: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        KeysConfig {
            previous_page: defaults::default_key_previous_page(),
            next_page: defaults::default_key_next_page(),
            toggle_header: defaults::default_key_toggle_header(),
            toggle_menu: defaults::default_key_toggle_menu(),
            close_menu: defaults::default_key_close_menu(),
        }
    }
}
