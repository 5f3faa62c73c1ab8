// src/crypto/mod.rs
//! Pure cryptographic operations: no I/O, no database
//!
//! The Cryptor is AES-256-GCM with a fresh random 96-bit nonce per call.
//! Every payload it produces has the layout `nonce(12) || ciphertext || tag(16)`.

mod capsule;
mod decrypt;
mod encrypt;
mod key;
mod sealer;

pub use capsule::Capsule;
pub use decrypt::decrypt;
pub use encrypt::encrypt;
pub use key::{derive_key, get_random_key};
pub use sealer::ValueSealer;

pub type Result<T> = std::result::Result<T, crate::error::CryptoError>;
