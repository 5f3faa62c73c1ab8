// src/config/mod.rs
//! Configuration system for encrypted-bucket-store
//!
//! TOML file plus `EBS_*` environment overrides, with a lazily loaded global.

pub use app::{load, StoreConfig};
pub use defaults::{BATCH_MODE_ENV, CONFIG_ENV, DB_FILE_ENV, DB_PATH_ENV};

mod app;
mod defaults;
