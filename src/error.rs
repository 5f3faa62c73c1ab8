// src/error.rs
//! Public error types for the entire crate

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the AEAD primitive and key material handling
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key: expected 32 bytes, got {len}")]
    InvalidKey { len: usize },

    #[error("ciphertext too short: {len} bytes")]
    CiphertextTooShort { len: usize },

    #[error("authentication failed: wrong key or corrupted payload")]
    AuthenticationFailed,

    #[error("sealing failed")]
    SealFailed,

    #[error("entropy source failure: {0}")]
    Entropy(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid path name: {0}")]
    InvalidPath(PathBuf),

    #[error("invalid file name: {0}")]
    InvalidFileName(PathBuf),

    #[error("invalid key or key is empty")]
    InvalidKey,

    #[error("data is nil")]
    NilData,

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("encrypt error: {0}")]
    EncryptFailed(#[source] CryptoError),

    #[error("decrypt error for key {key:?}: {source}")]
    DecryptFailed {
        key: String,
        #[source]
        source: CryptoError,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
