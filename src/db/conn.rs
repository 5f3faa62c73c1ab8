// src/db/conn.rs
//! Engine connection: open/close, schema, bucket initialisation and transactions

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::consts::DEFAULT_BUSY_TIMEOUT_MS;
use crate::error::{Result, StoreError};

use super::bucket::Bucket;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS buckets (
        name BLOB PRIMARY KEY NOT NULL
    ) WITHOUT ROWID;

    CREATE TABLE IF NOT EXISTS records (
        bucket BLOB NOT NULL,
        key BLOB NOT NULL,
        value BLOB NOT NULL,
        PRIMARY KEY (bucket, key)
    ) WITHOUT ROWID;
"#;

/// Tunables applied each time the engine is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub busy_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

/// One open connection to a store file
#[derive(Debug)]
pub struct Engine {
    conn: Connection,
    path: PathBuf,
}

impl Engine {
    /// Open (creating if needed) the store file and make sure every bucket in
    /// `buckets` exists.
    pub fn open(path: &Path, buckets: &[String], options: &EngineOptions) -> Result<Self> {
        let created = !path.exists();
        let conn = Connection::open(path)?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;

        #[cfg(unix)]
        if created {
            restrict_permissions(path)?;
        }

        let mut engine = Self {
            conn,
            path: path.to_path_buf(),
        };
        engine.ensure_buckets(buckets)?;

        debug!(path = %path.display(), created, "store engine opened");
        Ok(engine)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_buckets(&mut self, names: &[String]) -> Result<()> {
        let missing: Vec<&String> = self.view(|tx| {
            let mut missing = Vec::new();
            for name in names {
                if Bucket::lookup(tx, name)?.is_none() {
                    missing.push(name);
                }
            }
            Ok(missing)
        })?;
        if missing.is_empty() {
            return Ok(());
        }

        self.update(|tx| {
            for name in &missing {
                Bucket::create_if_absent(tx, name)?;
            }
            Ok(())
        })?;
        debug!(count = missing.len(), "created missing buckets");
        Ok(())
    }

    /// Run `f` inside a read transaction
    pub fn view<T>(&mut self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Run `f` inside the single write transaction; an `Err` rolls everything back
    pub fn update<T>(&mut self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| StoreError::Sql(e))?;
        debug!(path = %path.display(), "store engine closed");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    use crate::consts::STORE_FILE_MODE;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(STORE_FILE_MODE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buckets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn open_creates_requested_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.db");
        let mut engine =
            Engine::open(&path, &buckets(&["a", "b"]), &EngineOptions::default()).unwrap();

        engine
            .view(|tx| {
                assert!(Bucket::lookup(tx, "a")?.is_some());
                assert!(Bucket::lookup(tx, "b")?.is_some());
                assert!(Bucket::lookup(tx, "c")?.is_none());
                Ok(())
            })
            .unwrap();
        engine.close().unwrap();
    }

    #[test]
    fn failed_update_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.db");
        let mut engine = Engine::open(&path, &buckets(&["a"]), &EngineOptions::default()).unwrap();

        let result: Result<()> = engine.update(|tx| {
            Bucket::require(tx, "a")?.put(b"k", b"v")?;
            Err(StoreError::NilData)
        });
        assert!(matches!(result, Err(StoreError::NilData)));

        let value = engine
            .view(|tx| Ok(Bucket::require(tx, "a")?.get(b"k")?))
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn cursor_walks_keys_in_byte_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.db");
        let mut engine = Engine::open(&path, &buckets(&["a"]), &EngineOptions::default()).unwrap();

        engine
            .update(|tx| {
                let bucket = Bucket::require(tx, "a")?;
                for key in ["test", "asdfasdf", "taylor"] {
                    bucket.put(key.as_bytes(), b"x")?;
                }
                Ok(())
            })
            .unwrap();

        let keys = engine
            .view(|tx| {
                let keys = Bucket::require(tx, "a")?
                    .key_cursor()
                    .map(|entry| entry.map(|(k, _)| k))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(keys)
            })
            .unwrap();
        assert_eq!(keys, vec![b"asdfasdf".to_vec(), b"taylor".to_vec(), b"test".to_vec()]);

        let (first, rest) = engine
            .view(|tx| {
                let mut cursor = Bucket::require(tx, "a")?.cursor();
                let first = cursor.seek(b"tb")?;
                let rest = cursor.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok((first, rest))
            })
            .unwrap();
        assert_eq!(first, Some((b"test".to_vec(), b"x".to_vec())));
        assert!(rest.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn new_store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.db");
        Engine::open(&path, &[], &EngineOptions::default())
            .unwrap()
            .close()
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
