// src/consts.rs
//! Shared constants: cipher parameters, on-disk names and defaults

/// AES-256 key length
pub const KEY_LEN: usize = 32;

/// AES-GCM standard nonce length
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Default SQLite busy timeout in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default store file name
pub const DEFAULT_FILE_NAME: &str = "store.db";

/// Chunk size used when streaming a snapshot of the store file
pub const EXPORT_CHUNK_SIZE: usize = 64 * 1024;

/// Number of chunks the export producer may run ahead of the reader
pub const EXPORT_CHANNEL_DEPTH: usize = 4;

/// Mode applied to newly created store files on Unix
#[cfg(unix)]
pub const STORE_FILE_MODE: u32 = 0o600;
