use super::defaults;
use super::models::AppConfig;
use super::tables::{ConfigTables, SECTION_NAMES};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the configuration at `path`, falling back to defaults when the file is
/// missing or invalid.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse either the sectioned layout (`[reader]`, `[keys]`, ...) or a flat
/// file of `AppConfig` fields.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let table: toml::Table = toml::from_str(contents).context("config is not valid TOML")?;
    let sectioned = SECTION_NAMES
        .iter()
        .any(|name| table.get(*name).is_some_and(toml::Value::is_table));

    let mut config = if sectioned {
        toml::from_str::<ConfigTables>(contents)
            .context("invalid sectioned config")?
            .into()
    } else {
        toml::from_str::<AppConfig>(contents).context("invalid config")?
    };

    if !config.visibility_threshold.is_finite() {
        warn!(
            threshold = config.visibility_threshold,
            "visibility_threshold is not a number; using default"
        );
        config.visibility_threshold = defaults::default_visibility_threshold();
    } else if !(0.0..=1.0).contains(&config.visibility_threshold) {
        warn!(
            threshold = config.visibility_threshold,
            "visibility_threshold outside [0, 1]; clamping"
        );
        config.visibility_threshold = config.visibility_threshold.clamp(0.0, 1.0);
    }
    config.preload_workers = config.preload_workers.max(1);
    Ok(config)
}

/// Serialize using the sectioned layout.
pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(&ConfigTables::from(config)).context("failed to serialize config")
}
