// src/db/bucket.rs
//! Bucket namespaces and ordered cursors over their keys
//!
//! Keys and bucket names are BLOBs, so every comparison is byte-wise and
//! iteration order is plain lexicographic order of the key bytes.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};

const FIND_BUCKET: &str = "SELECT 1 FROM buckets WHERE name = ?1";
const CREATE_BUCKET: &str = "INSERT OR IGNORE INTO buckets (name) VALUES (?1)";

const GET_VALUE: &str = "SELECT value FROM records WHERE bucket = ?1 AND key = ?2";
const PUT_VALUE: &str = "INSERT OR REPLACE INTO records (bucket, key, value) VALUES (?1, ?2, ?3)";
const DELETE_VALUE: &str = "DELETE FROM records WHERE bucket = ?1 AND key = ?2";

const SEEK_ENTRY: &str =
    "SELECT key, value FROM records WHERE bucket = ?1 AND key >= ?2 ORDER BY key LIMIT 1";
const NEXT_ENTRY: &str =
    "SELECT key, value FROM records WHERE bucket = ?1 AND key > ?2 ORDER BY key LIMIT 1";
const SEEK_KEY: &str =
    "SELECT key, X'' FROM records WHERE bucket = ?1 AND key >= ?2 ORDER BY key LIMIT 1";
const NEXT_KEY: &str =
    "SELECT key, X'' FROM records WHERE bucket = ?1 AND key > ?2 ORDER BY key LIMIT 1";

/// A `(key, value)` pair as stored on disk
pub type Entry = (Vec<u8>, Vec<u8>);

/// Handle to an existing bucket inside an open transaction
#[derive(Debug, Clone, Copy)]
pub struct Bucket<'a> {
    conn: &'a Connection,
    name: &'a str,
}

impl<'a> Bucket<'a> {
    pub fn lookup(conn: &'a Connection, name: &'a str) -> rusqlite::Result<Option<Self>> {
        let found = conn
            .prepare_cached(FIND_BUCKET)?
            .query_row([name.as_bytes()], |_| Ok(()))
            .optional()?;
        Ok(found.map(|()| Self { conn, name }))
    }

    /// Like [`Bucket::lookup`], but a missing bucket is an error
    pub fn require(conn: &'a Connection, name: &'a str) -> Result<Self> {
        Self::lookup(conn, name)?.ok_or_else(|| StoreError::BucketNotFound(name.to_owned()))
    }

    /// Idempotent bucket creation
    pub fn create_if_absent(conn: &Connection, name: &str) -> rusqlite::Result<()> {
        conn.prepare_cached(CREATE_BUCKET)?
            .execute([name.as_bytes()])?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Exact-match lookup
    pub fn get(&self, key: &[u8]) -> rusqlite::Result<Option<Vec<u8>>> {
        self.conn
            .prepare_cached(GET_VALUE)?
            .query_row(params![self.name.as_bytes(), key], |row| row.get(0))
            .optional()
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> rusqlite::Result<()> {
        self.conn
            .prepare_cached(PUT_VALUE)?
            .execute(params![self.name.as_bytes(), key, value])?;
        Ok(())
    }

    /// Removing an absent key is not an error
    pub fn delete(&self, key: &[u8]) -> rusqlite::Result<()> {
        self.conn
            .prepare_cached(DELETE_VALUE)?
            .execute(params![self.name.as_bytes(), key])?;
        Ok(())
    }

    pub fn cursor(&self) -> Cursor<'a> {
        Cursor::new(*self, true)
    }

    /// Cursor whose entries carry empty values; record values are never read
    pub fn key_cursor(&self) -> Cursor<'a> {
        Cursor::new(*self, false)
    }
}

#[derive(Debug)]
enum Position {
    Unpositioned,
    At(Vec<u8>),
    Exhausted,
}

/// Ascending walk over one bucket.
///
/// [`Cursor::seek`] positions on the first key `>= start`; iterating then
/// yields the entries that follow. Iterating an unpositioned cursor starts at
/// the first key of the bucket.
#[derive(Debug)]
pub struct Cursor<'a> {
    bucket: Bucket<'a>,
    with_values: bool,
    position: Position,
}

impl<'a> Cursor<'a> {
    fn new(bucket: Bucket<'a>, with_values: bool) -> Self {
        Self {
            bucket,
            with_values,
            position: Position::Unpositioned,
        }
    }

    pub fn seek(&mut self, start: &[u8]) -> rusqlite::Result<Option<Entry>> {
        let sql = if self.with_values { SEEK_ENTRY } else { SEEK_KEY };
        let step = self.fetch(sql, start);
        self.advance(step).transpose()
    }

    fn fetch(&self, sql: &str, bound: &[u8]) -> rusqlite::Result<Option<Entry>> {
        self.bucket
            .conn
            .prepare_cached(sql)?
            .query_row(params![self.bucket.name.as_bytes(), bound], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()
    }

    fn advance(
        &mut self,
        step: rusqlite::Result<Option<Entry>>,
    ) -> Option<rusqlite::Result<Entry>> {
        match step {
            Ok(Some(entry)) => {
                self.position = Position::At(entry.0.clone());
                Some(Ok(entry))
            }
            Ok(None) => {
                self.position = Position::Exhausted;
                None
            }
            Err(e) => {
                self.position = Position::Exhausted;
                Some(Err(e))
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = rusqlite::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let (sql, bound) = match &self.position {
            Position::Exhausted => return None,
            Position::Unpositioned if self.with_values => (SEEK_ENTRY, &b""[..]),
            Position::Unpositioned => (SEEK_KEY, &b""[..]),
            Position::At(last) if self.with_values => (NEXT_ENTRY, last.as_slice()),
            Position::At(last) => (NEXT_KEY, last.as_slice()),
        };
        let step = self.fetch(sql, bound);
        self.advance(step)
    }
}
