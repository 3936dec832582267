use super::models::{LogLevel, WorkSourceConfig};

pub(crate) fn default_log_level() -> LogLevel {
    LogLevel::Info
}

pub(crate) fn default_visibility_threshold() -> f32 {
    0.5
}

pub(crate) fn default_preload_next_chapter() -> bool {
    true
}

pub(crate) fn default_preload_workers() -> usize {
    4
}

pub(crate) fn default_http_timeout_secs() -> u64 {
    20
}

pub(crate) fn default_preferences_path() -> String {
    ".cache/preferences.toml".to_string()
}

pub(crate) fn default_key_previous_page() -> String {
    "left".to_string()
}

pub(crate) fn default_key_next_page() -> String {
    "right".to_string()
}

pub(crate) fn default_key_toggle_header() -> String {
    "h".to_string()
}

pub(crate) fn default_key_toggle_menu() -> String {
    "m".to_string()
}

pub(crate) fn default_key_close_menu() -> String {
    "escape".to_string()
}

pub(crate) fn default_works() -> Vec<WorkSourceConfig> {
    vec![
        WorkSourceConfig {
            title: "Tsumi to Batsu no Spica".to_string(),
            manifest: "https://raw.githubusercontent.com/ASSAROCKT/aphroditescans/refs/heads/main/Tsumi%20to%20Batsu%20no%20Spica.json".to_string(),
            genre: Some("Shoujo".to_string()),
        },
        WorkSourceConfig {
            title: "Olympia of Infidelity".to_string(),
            manifest: "https://raw.githubusercontent.com/ASSAROCKT/aphroditescans/refs/heads/main/Olympia%20of%20Infidelity.json".to_string(),
            genre: Some("Adult, Drama".to_string()),
        },
    ]
}
