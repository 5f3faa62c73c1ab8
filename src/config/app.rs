// src/config/app.rs
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::defaults::*;
use crate::error::{Result, StoreError};

/// Where the store lives and how its handle behaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding the store file; `None` or empty means the working directory
    pub path: Option<PathBuf>,
    pub file_name: String,
    /// Buckets created when the store is opened
    pub buckets: Vec<String>,
    pub batch_mode: bool,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            file_name: default_file_name(),
            buckets: Vec::new(),
            batch_mode: false,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides looked up through `var` (normally `std::env::var`)
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var(DB_PATH_ENV) {
            self.path = Some(PathBuf::from(path));
        }
        if let Some(file_name) = var(DB_FILE_ENV) {
            self.file_name = file_name;
        }
        if let Some(raw) = var(BATCH_MODE_ENV) {
            match parse_flag(&raw) {
                Some(flag) => self.batch_mode = flag,
                None => warn!(value = %raw, "ignoring unrecognised {BATCH_MODE_ENV}"),
            }
        }
    }

    /// Read the config file named by the environment (or the default location),
    /// falling back to built-in defaults, then apply `EBS_*` overrides.
    pub fn resolve() -> Self {
        let config_path = default_config_path();
        let mut conf = if config_path.exists() {
            Self::from_file(&config_path).unwrap_or_else(|e| {
                warn!(path = %config_path.display(), error = %e, "invalid config, using built-in defaults");
                Self::default()
            })
        } else {
            Self::default()
        };
        conf.apply_overrides(|name| std::env::var(name).ok());
        conf
    }
}

static CONFIG: OnceLock<StoreConfig> = OnceLock::new();

/// Global config, resolved once on first use
pub fn load() -> &'static StoreConfig {
    CONFIG.get_or_init(StoreConfig::resolve)
}
