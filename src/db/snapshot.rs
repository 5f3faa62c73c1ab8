// src/db/snapshot.rs
//! Streaming whole-file export of a store
//!
//! A producer thread holds a read transaction (SQLite's shared lock) for the
//! whole copy, so no writer can touch the file while it is streamed. Chunks
//! travel over a bounded channel; a failure on the producer side is delivered
//! to the reader as an `io::Error`, never as a silent end of stream.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::consts::{EXPORT_CHANNEL_DEPTH, EXPORT_CHUNK_SIZE};

type Chunk = io::Result<Vec<u8>>;

/// Reader side of a running export
pub struct SnapshotReader {
    chunks: Receiver<Chunk>,
    current: Vec<u8>,
    offset: usize,
    producer: Option<JoinHandle<()>>,
}

impl SnapshotReader {
    /// Start streaming the store file at `path`
    pub fn spawn(path: &Path, busy_timeout: Duration) -> io::Result<Self> {
        let (tx, rx) = bounded(EXPORT_CHANNEL_DEPTH);
        let path = path.to_path_buf();
        let producer = thread::Builder::new()
            .name("store-export".into())
            .spawn(move || produce(path, busy_timeout, tx))?;

        Ok(Self {
            chunks: rx,
            current: Vec::new(),
            offset: 0,
            producer: Some(producer),
        })
    }

    /// Called once the channel is closed: a clean exit is EOF, a panic is an error
    fn finish(&mut self) -> io::Result<usize> {
        match self.producer.take().map(JoinHandle::join) {
            Some(Err(_)) => Err(io::Error::other("store export producer panicked")),
            _ => Ok(0),
        }
    }
}

impl Read for SnapshotReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.offset == self.current.len() {
            match self.chunks.recv() {
                Ok(Ok(chunk)) => {
                    self.current = chunk;
                    self.offset = 0;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return self.finish(),
            }
        }
        let n = buf.len().min(self.current.len() - self.offset);
        buf[..n].copy_from_slice(&self.current[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

impl std::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("buffered", &(self.current.len() - self.offset))
            .field("running", &self.producer.is_some())
            .finish()
    }
}

fn produce(path: PathBuf, busy_timeout: Duration, tx: Sender<Chunk>) {
    if let Err(e) = stream_file(&path, busy_timeout, &tx) {
        warn!(path = %path.display(), error = %e, "store export failed");
        // The reader may already be gone; nothing else to report to.
        let _ = tx.send(Err(e));
    }
}

fn stream_file(path: &Path, busy_timeout: Duration, tx: &Sender<Chunk>) -> io::Result<()> {
    let mut conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(io::Error::other)?;
    conn.busy_timeout(busy_timeout).map_err(io::Error::other)?;

    // Opened before the transaction so it is closed after the rollback on
    // every path; closing it drops this process's POSIX locks on the file.
    let mut file = File::open(path)?;
    let read_tx = conn.transaction().map_err(io::Error::other)?;
    // First read takes the shared lock, held until the transaction ends.
    read_tx
        .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(io::Error::other)?;

    let mut sent = 0u64;
    loop {
        let mut chunk = vec![0u8; EXPORT_CHUNK_SIZE];
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        chunk.truncate(n);
        if tx.send(Ok(chunk)).is_err() {
            debug!("store export reader dropped early");
            break;
        }
        sent += n as u64;
    }

    read_tx.rollback().map_err(io::Error::other)?;
    debug!(path = %path.display(), bytes = sent, "store export finished");
    Ok(())
}
