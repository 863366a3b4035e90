//! Configuration loading and resolution
//!
//! Settings resolve with environment variables taking priority over the
//! TOML config file, falling back to compiled defaults:
//! 1. Environment variable (highest priority)
//! 2. TOML config file (`~/.config/sadhana/config.toml`)
//! 3. Compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5730";
pub const DEFAULT_CACHE_MAX_AGE_SECONDS: i64 = 600;

/// Spreadsheet export URLs, one per tabular source
///
/// A missing URL degrades that source to an empty table at sync time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetSources {
    pub meditation_url: Option<String>,
    pub practice_url: Option<String>,
    pub class_url: Option<String>,
    pub form_url: Option<String>,
}

/// TOML configuration file shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub database_path: Option<String>,
    pub cache_max_age_seconds: Option<i64>,
    #[serde(default)]
    pub sheets: SheetSources,
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: String,
    pub database_path: PathBuf,
    pub cache_max_age_seconds: i64,
    pub sheets: SheetSources,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            database_path: default_database_path(),
            cache_max_age_seconds: DEFAULT_CACHE_MAX_AGE_SECONDS,
            sheets: SheetSources::default(),
        }
    }
}

/// Resolve settings from environment and config file
pub fn load_settings() -> Result<Settings> {
    let toml_config = match load_toml_config() {
        Ok(config) => config,
        Err(Error::Config(reason)) => {
            debug!(reason, "No TOML config loaded, using env/defaults");
            TomlConfig::default()
        }
        Err(e) => return Err(e),
    };

    let bind_address = env_var("SADHANA_BIND_ADDRESS")
        .or(toml_config.bind_address)
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

    let database_path = env_var("SADHANA_DB_PATH")
        .or(toml_config.database_path)
        .map(PathBuf::from)
        .unwrap_or_else(default_database_path);

    let cache_max_age_seconds = match env_var("SADHANA_CACHE_MAX_AGE") {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|e| Error::Config(format!("SADHANA_CACHE_MAX_AGE: {}", e)))?,
        None => toml_config
            .cache_max_age_seconds
            .unwrap_or(DEFAULT_CACHE_MAX_AGE_SECONDS),
    };

    let sheets = SheetSources {
        meditation_url: env_var("SADHANA_MEDITATION_URL").or(toml_config.sheets.meditation_url),
        practice_url: env_var("SADHANA_PRACTICE_URL").or(toml_config.sheets.practice_url),
        class_url: env_var("SADHANA_CLASS_URL").or(toml_config.sheets.class_url),
        form_url: env_var("SADHANA_FORM_URL").or(toml_config.sheets.form_url),
    };

    Ok(Settings {
        bind_address,
        database_path,
        cache_max_age_seconds,
        sheets,
    })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load the TOML config file if one exists
fn load_toml_config() -> Result<TomlConfig> {
    let path = dirs::config_dir()
        .map(|d| d.join("sadhana").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if !path.exists() {
        return Err(Error::Config(format!("Config file not found: {:?}", path)));
    }

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sadhana").join("sadhana.db"))
        .unwrap_or_else(|| PathBuf::from("./sadhana.db"))
}
