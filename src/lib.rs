// src/lib.rs
//! encrypted-bucket-store: encrypted access layer over an ordered key-value store
//!
//! Features:
//! - Named buckets, each an independent keyspace in ascending byte order
//! - Prefix scans and prefix-seek lookups
//! - Transparent AES-256-GCM value encryption (`nonce || ciphertext || tag`)
//! - Open-per-operation or batch (always open) connection lifecycle
//! - Streaming whole-file export
//!
//! ```no_run
//! use encrypted_bucket_store::StoreHandle;
//!
//! # fn main() -> encrypted_bucket_store::Result<()> {
//! let store = StoreHandle::open(".", "test.db", Some(b"secret".as_slice()), false, ["pii"])?;
//! store.save("pii", "taylor", &serde_json::json!({ "name": "taylor" }))?;
//! let keys = store.get_key_list("pii", "t")?;
//! # Ok(())
//! # }
//! ```

pub mod aliases;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod db;
pub mod error;
pub mod store;

// Re-export everything users need at the crate root
pub use aliases::{PlainText, StoreKey32};
pub use config::{load as load_config, StoreConfig};
pub use crypto::{decrypt, derive_key, encrypt, get_random_key, Capsule, ValueSealer};
pub use db::SnapshotReader;
pub use error::{CryptoError, Result, StoreError};
pub use store::{ConnectionStats, StoreHandle};
