use serde::Deserialize;
use ts_rs::TS;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub default_mode: ReadingMode,
    #[serde(default = "crate::config::defaults::default_visibility_threshold")]
    pub visibility_threshold: f32,
    #[serde(default = "crate::config::defaults::default_preload_next_chapter")]
    pub preload_next_chapter: bool,
    #[serde(default = "crate::config::defaults::default_preload_workers")]
    pub preload_workers: usize,
    #[serde(default = "crate::config::defaults::default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_preferences_path")]
    pub preferences_path: String,
    #[serde(default = "crate::config::defaults::default_key_previous_page")]
    pub key_previous_page: String,
    #[serde(default = "crate::config::defaults::default_key_next_page")]
    pub key_next_page: String,
    #[serde(default = "crate::config::defaults::default_key_toggle_header")]
    pub key_toggle_header: String,
    #[serde(default = "crate::config::defaults::default_key_toggle_menu")]
    pub key_toggle_menu: String,
    #[serde(default = "crate::config::defaults::default_key_close_menu")]
    pub key_close_menu: String,
    #[serde(default = "crate::config::defaults::default_works")]
    pub works: Vec<WorkSourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            default_mode: ReadingMode::Vertical,
            visibility_threshold: crate::config::defaults::default_visibility_threshold(),
            preload_next_chapter: crate::config::defaults::default_preload_next_chapter(),
            preload_workers: crate::config::defaults::default_preload_workers(),
            http_timeout_secs: crate::config::defaults::default_http_timeout_secs(),
            preferences_path: crate::config::defaults::default_preferences_path(),
            key_previous_page: crate::config::defaults::default_key_previous_page(),
            key_next_page: crate::config::defaults::default_key_next_page(),
            key_toggle_header: crate::config::defaults::default_key_toggle_header(),
            key_toggle_menu: crate::config::defaults::default_key_toggle_menu(),
            key_close_menu: crate::config::defaults::default_key_close_menu(),
            works: crate::config::defaults::default_works(),
        }
    }
}

/// A work the reader knows how to fetch.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq, Eq)]
pub struct WorkSourceConfig {
    pub title: String,
    /// HTTP(S) URL or local path of the JSON manifest.
    pub manifest: String,
    #[serde(default)]
    pub genre: Option<String>,
}

/// How pages of a chapter are laid out and navigated.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Hash, Default, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ReadingMode {
    /// Continuous scroll; position follows viewport visibility.
    #[default]
    Vertical,
    /// One focused page at a time.
    Single,
    /// Two-page spread.
    Double,
}

impl ReadingMode {
    pub const ALL: [ReadingMode; 3] = [
        ReadingMode::Vertical,
        ReadingMode::Single,
        ReadingMode::Double,
    ];

    /// Single and Double drive position by explicit page index.
    pub fn is_paged(self) -> bool {
        matches!(self, ReadingMode::Single | ReadingMode::Double)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReadingMode::Vertical => "vertical",
            ReadingMode::Single => "single",
            ReadingMode::Double => "double",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vertical" | "long-strip" | "strip" => Some(ReadingMode::Vertical),
            "single" => Some(ReadingMode::Single),
            "double" | "spread" => Some(ReadingMode::Double),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReadingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReadingMode::Vertical => "Long Strip",
            ReadingMode::Single => "Single Page",
            ReadingMode::Double => "Double Page",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
