// src/db/mod.rs
//! Ordered, bucket-partitioned storage engine on top of SQLite
//!
//! The rest of the crate only relies on what this module exposes: open and
//! close, read/write transactions, bucket lookup and creation, cursors with
//! seek, put/delete, and a streaming whole-file export.

pub mod bucket;
pub mod conn;
pub mod snapshot;

pub use bucket::{Bucket, Cursor, Entry};
pub use conn::{Engine, EngineOptions};
pub use snapshot::SnapshotReader;
