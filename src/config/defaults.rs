// src/config/defaults.rs
use std::path::PathBuf;

use crate::consts::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_FILE_NAME};

/// Path of the TOML file read by [`super::load`]
pub const CONFIG_ENV: &str = "EBS_CONFIG";
/// Overrides `path`
pub const DB_PATH_ENV: &str = "EBS_DB_PATH";
/// Overrides `file_name`
pub const DB_FILE_ENV: &str = "EBS_DB_FILE";
/// Overrides `batch_mode` (`1`/`true`/`yes` or `0`/`false`/`no`)
pub const BATCH_MODE_ENV: &str = "EBS_BATCH_MODE";

const APP_DIR: &str = "encrypted-bucket-store";
const CONFIG_FILE: &str = "config.toml";

pub fn default_file_name() -> String {
    DEFAULT_FILE_NAME.into()
}

pub fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// `$EBS_CONFIG`, else `<config dir>/encrypted-bucket-store/config.toml`,
/// else `config.toml` in the working directory
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
