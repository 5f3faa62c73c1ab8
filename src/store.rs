// src/store.rs
//! Store handle: connection lifecycle, batch mode and bucket-scoped operations
//!
//! Every public operation leases the engine connection through
//! [`StoreHandle::with_engine`]: the connection is opened if none is live and,
//! unless batch mode is on, closed again on every exit path, including errors.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::crypto::ValueSealer;
use crate::db::{Bucket, Engine, EngineOptions, Entry, SnapshotReader};
use crate::error::{Result, StoreError};

/// Open/close counters for the engine connection of one handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub opens: u64,
    pub closes: u64,
}

#[derive(Debug)]
struct ConnSlot {
    batch_mode: bool,
    engine: Option<Engine>,
}

/// Encrypted, bucket-partitioned access to one store file.
///
/// The handle is `Send + Sync`; share it behind an `Arc`. Operations on one
/// handle are serialised by its connection slot, so toggling batch mode
/// never races with an operation that holds the connection.
#[derive(Debug)]
pub struct StoreHandle {
    full_path: PathBuf,
    buckets: Vec<String>,
    options: EngineOptions,
    sealer: RwLock<Arc<ValueSealer>>,
    slot: Mutex<ConnSlot>,
    opens: AtomicU64,
    closes: AtomicU64,
}

impl StoreHandle {
    /// Open the store at `path/file_name`, creating the file and any missing
    /// `buckets`.
    ///
    /// An empty `path` means the current directory. `secret = None` stores
    /// values as raw bytes; any secret turns on encryption with its derived
    /// 32-byte key.
    pub fn open<I, S>(
        path: impl AsRef<Path>,
        file_name: &str,
        secret: Option<&[u8]>,
        batch_mode: bool,
        buckets: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::open_with_options(
            path.as_ref(),
            file_name,
            secret,
            batch_mode,
            buckets.into_iter().map(Into::into).collect(),
            EngineOptions::default(),
        )
    }

    /// Open the store described by `config`
    pub fn from_config(config: &StoreConfig, secret: Option<&[u8]>) -> Result<Self> {
        Self::open_with_options(
            config.path.as_deref().unwrap_or(Path::new("")),
            &config.file_name,
            secret,
            config.batch_mode,
            config.buckets.clone(),
            EngineOptions {
                busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            },
        )
    }

    fn open_with_options(
        dir: &Path,
        file_name: &str,
        secret: Option<&[u8]>,
        batch_mode: bool,
        buckets: Vec<String>,
        options: EngineOptions,
    ) -> Result<Self> {
        if !dir.as_os_str().is_empty() {
            match fs::metadata(dir) {
                Ok(meta) if meta.is_dir() => {}
                _ => return Err(StoreError::InvalidPath(dir.to_path_buf())),
            }
        }

        let full_path = dir.join(file_name);
        match fs::metadata(&full_path) {
            Ok(meta) if !meta.is_file() => {
                return Err(StoreError::InvalidFileName(full_path));
            }
            Ok(_) => {}
            Err(_) => debug!(path = %full_path.display(), "store file does not exist, will be created"),
        }

        let handle = Self {
            full_path,
            buckets,
            options,
            sealer: RwLock::new(Arc::new(ValueSealer::from_secret(secret))),
            slot: Mutex::new(ConnSlot {
                batch_mode,
                engine: None,
            }),
            opens: AtomicU64::new(0),
            closes: AtomicU64::new(0),
        };
        handle.with_engine(|_| Ok(()))?;
        Ok(handle)
    }

    pub fn path(&self) -> &Path {
        &self.full_path
    }

    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    // ── Secret and lifecycle policy ──────────────────────────────────────

    /// Replace the effective key in memory. Values already stored are not
    /// re-encrypted.
    pub fn set_secret(&self, secret: &[u8]) {
        *self.sealer.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(ValueSealer::from_secret(Some(secret)));
    }

    /// Stop encrypting; subsequent reads and writes use raw bytes
    pub fn clear_secret(&self) {
        *self.sealer.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(ValueSealer::Plain);
    }

    pub fn is_encrypted(&self) -> bool {
        self.sealer().is_encrypted()
    }

    /// Keep the connection open between operations (`true`) or open and
    /// close it around each one (`false`). Turning batch mode off closes a
    /// live connection immediately.
    pub fn set_batch_mode(&self, enabled: bool) {
        let mut slot = self.lock_slot();
        slot.batch_mode = enabled;
        if !enabled {
            if let Some(engine) = slot.engine.take() {
                if let Err(e) = self.close_engine(engine) {
                    warn!(error = %e, "closing store connection failed");
                }
            }
        }
    }

    pub fn batch_mode(&self) -> bool {
        self.lock_slot().batch_mode
    }

    pub fn is_open(&self) -> bool {
        self.lock_slot().engine.is_some()
    }

    /// Turn batch mode off and close the connection, reporting close failures
    pub fn close(&self) -> Result<()> {
        let mut slot = self.lock_slot();
        slot.batch_mode = false;
        match slot.engine.take() {
            Some(engine) => self.close_engine(engine),
            None => Ok(()),
        }
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        ConnectionStats {
            opens: self.opens.load(Ordering::Relaxed),
            closes: self.closes.load(Ordering::Relaxed),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Value of the first key at or after `key` that starts with `key`.
    ///
    /// This is a prefix match: with only `"taylor"` stored, `get_one("ta")`
    /// returns its value. Nothing found yields an empty vector; use
    /// [`StoreHandle::get_exact`] to tell "missing" from "empty".
    pub fn get_one(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let sealer = self.sealer();
        let prefix = key.as_bytes();

        let found = self.with_engine(|engine| {
            engine.view(|tx| {
                let mut cursor = Bucket::require(tx, bucket)?.cursor();
                Ok(cursor.seek(prefix)?.filter(|(k, _)| k.starts_with(prefix)))
            })
        })?;

        match found {
            Some((k, v)) => open_value(&sealer, &k, &v),
            None => Ok(Vec::new()),
        }
    }

    /// Exact-key lookup
    pub fn get_exact(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let sealer = self.sealer();

        let stored = self.with_engine(|engine| {
            engine.view(|tx| Ok(Bucket::require(tx, bucket)?.get(key.as_bytes())?))
        })?;

        stored
            .map(|v| open_value(&sealer, key.as_bytes(), &v))
            .transpose()
    }

    /// Exact-key lookup decoded from the JSON written by [`StoreHandle::save`]
    pub fn load<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> Result<Option<T>> {
        match self.get_exact(bucket, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every record whose key starts with `prefix`, in ascending key order.
    /// An empty prefix matches the whole bucket. One undecryptable record
    /// fails the whole scan.
    pub fn get_by_prefix(&self, bucket: &str, prefix: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let sealer = self.sealer();
        let entries = self.with_engine(|engine| {
            engine.view(|tx| scan_prefix(&Bucket::require(tx, bucket)?, prefix.as_bytes(), true))
        })?;

        let mut results = BTreeMap::new();
        for (k, v) in entries {
            let Some(key) = key_string(bucket, k) else {
                continue;
            };
            trace!(bucket, key = %key, "decoding scanned record");
            let value = open_value(&sealer, key.as_bytes(), &v)?;
            results.insert(key, value);
        }
        Ok(results)
    }

    /// Keys starting with `prefix`, in ascending order. Values are not read.
    /// Keys that are not valid UTF-8 (only a raw writer can store them) are
    /// skipped here and in [`StoreHandle::get_by_prefix`].
    pub fn get_key_list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let entries = self.with_engine(|engine| {
            engine.view(|tx| scan_prefix(&Bucket::require(tx, bucket)?, prefix.as_bytes(), false))
        })?;
        Ok(entries
            .into_iter()
            .filter_map(|(k, _)| key_string(bucket, k))
            .collect())
    }

    // ── Writes ───────────────────────────────────────────────────────────

    /// Store `value` as JSON under `key`. A value that encodes to JSON `null`
    /// is rejected with [`StoreError::NilData`].
    pub fn save<T: Serialize + ?Sized>(&self, bucket: &str, key: &str, value: &T) -> Result<()> {
        validate_key(key)?;
        let encoded = serde_json::to_vec(value)?;
        if encoded == b"null" {
            return Err(StoreError::NilData);
        }
        self.put_sealed(bucket, key, &encoded)
    }

    /// Store already-serialised bytes under `key`
    pub fn save_bytes(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.put_sealed(bucket, key, data)
    }

    /// Remove `key`; removing a missing key succeeds
    pub fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        validate_key(key)?;
        self.with_engine(|engine| {
            engine.update(|tx| Ok(Bucket::require(tx, bucket)?.delete(key.as_bytes())?))
        })
    }

    fn put_sealed(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        let sealed = self
            .sealer()
            .seal(data)
            .map_err(StoreError::EncryptFailed)?;
        self.with_engine(|engine| {
            engine.update(|tx| Ok(Bucket::require(tx, bucket)?.put(key.as_bytes(), &sealed)?))
        })
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Stream a consistent copy of the whole store file. Values inside stay
    /// exactly as stored (encrypted when a secret is configured).
    pub fn export_raw(&self) -> Result<SnapshotReader> {
        self.with_engine(|_| Ok(()))?;
        Ok(SnapshotReader::spawn(
            &self.full_path,
            self.options.busy_timeout,
        )?)
    }

    /// Copy a snapshot into `writer`, returning the number of bytes written
    pub fn export_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64> {
        let mut reader = self.export_raw()?;
        Ok(io::copy(&mut reader, writer)?)
    }

    /// Whole snapshot in memory
    pub fn export_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.export_raw()?.read_to_end(&mut out)?;
        Ok(out)
    }

    // ── Connection lease ─────────────────────────────────────────────────

    /// Run `f` with a live engine: open one if needed, and close it afterwards
    /// unless batch mode is on. A failed open leaves the slot empty so the
    /// next call retries cleanly.
    fn with_engine<T>(&self, f: impl FnOnce(&mut Engine) -> Result<T>) -> Result<T> {
        let mut slot = self.lock_slot();
        let mut engine = match slot.engine.take() {
            Some(engine) => engine,
            None => {
                let engine = Engine::open(&self.full_path, &self.buckets, &self.options)?;
                self.opens.fetch_add(1, Ordering::Relaxed);
                engine
            }
        };

        let result = f(&mut engine);

        if slot.batch_mode {
            slot.engine = Some(engine);
        } else if let Err(e) = self.close_engine(engine) {
            warn!(error = %e, "closing store connection failed");
        }
        result
    }

    fn close_engine(&self, engine: Engine) -> Result<()> {
        self.closes.fetch_add(1, Ordering::Relaxed);
        engine.close()
    }

    fn lock_slot(&self) -> MutexGuard<'_, ConnSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sealer(&self) -> Arc<ValueSealer> {
        Arc::clone(&self.sealer.read().unwrap_or_else(PoisonError::into_inner))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey);
    }
    Ok(())
}

fn key_string(bucket: &str, key: Vec<u8>) -> Option<String> {
    match String::from_utf8(key) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(bucket, key = ?e.as_bytes(), "skipping key that is not valid UTF-8");
            None
        }
    }
}

fn open_value(sealer: &ValueSealer, key: &[u8], stored: &[u8]) -> Result<Vec<u8>> {
    sealer.open(stored).map_err(|source| {
        let key = String::from_utf8_lossy(key).into_owned();
        warn!(key = %key, error = %source, "stored value failed to decrypt");
        StoreError::DecryptFailed { key, source }
    })
}

/// Walk `bucket` from `prefix` while keys keep that prefix
fn scan_prefix(bucket: &Bucket<'_>, prefix: &[u8], with_values: bool) -> Result<Vec<Entry>> {
    let mut cursor = if with_values {
        bucket.cursor()
    } else {
        bucket.key_cursor()
    };

    let mut out = Vec::new();
    let mut next = cursor.seek(prefix)?;
    while let Some((k, v)) = next {
        if !k.starts_with(prefix) {
            break;
        }
        if with_values && prefix.is_empty() && k.is_empty() && v.is_empty() {
            break;
        }
        out.push((k, v));
        next = cursor.next().transpose()?;
    }
    Ok(out)
}
