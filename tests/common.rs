// tests/common.rs
//! Shared test utilities: logging setup and store fixtures

use std::path::{Path, PathBuf};

use encrypted_bucket_store::StoreHandle;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize test-friendly logging; respects RUST_LOG and is safe to call repeatedly
#[allow(dead_code)]
pub fn setup() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(dead_code)]
pub struct Article {
    pub id: String,
    pub title: String,
}

#[allow(dead_code)]
impl Article {
    pub fn sample() -> Self {
        Self {
            id: "ID-0001".into(),
            title: "input with more than 16 characters".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(dead_code)]
pub struct Pii {
    pub name: String,
}

/// A store living in its own temporary directory
#[allow(dead_code)]
pub struct TestStore {
    pub dir: TempDir,
    pub handle: StoreHandle,
}

#[allow(dead_code)]
impl TestStore {
    pub const FILE_NAME: &'static str = "test.db";

    pub fn new(secret: Option<&[u8]>, batch_mode: bool, buckets: &[&str]) -> Self {
        setup();
        let dir = tempfile::tempdir().expect("create temp dir");
        let handle = StoreHandle::open(
            dir.path(),
            Self::FILE_NAME,
            secret,
            batch_mode,
            buckets.iter().copied(),
        )
        .expect("open store");
        Self { dir, handle }
    }

    pub fn encrypted(buckets: &[&str]) -> Self {
        Self::new(Some(b"secret"), false, buckets)
    }

    pub fn plain(buckets: &[&str]) -> Self {
        Self::new(None, false, buckets)
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.path().join(Self::FILE_NAME)
    }

    /// Bytes exactly as stored on disk, bypassing the handle
    pub fn raw_value(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        read_raw(&self.file_path(), bucket, key)
    }

    /// Overwrite a stored value on disk, bypassing the handle
    pub fn write_raw(&self, bucket: &str, key: &str, value: &[u8]) {
        self.write_raw_key(bucket, key.as_bytes(), value);
    }

    /// Like [`TestStore::write_raw`], for keys that need not be UTF-8
    pub fn write_raw_key(&self, bucket: &str, key: &[u8], value: &[u8]) {
        let conn = Connection::open(self.file_path()).expect("open raw");
        conn.execute(
            "INSERT OR REPLACE INTO records (bucket, key, value) VALUES (?1, ?2, ?3)",
            params![bucket.as_bytes(), key, value],
        )
        .expect("raw write");
    }
}

#[allow(dead_code)]
pub fn read_raw(file: &Path, bucket: &str, key: &str) -> Option<Vec<u8>> {
    let conn = Connection::open(file).expect("open raw");
    conn.query_row(
        "SELECT value FROM records WHERE bucket = ?1 AND key = ?2",
        params![bucket.as_bytes(), key.as_bytes()],
        |row| row.get(0),
    )
    .optional()
    .expect("raw read")
}
