// src/aliases.rs
//! Zeroizing secret types used throughout the crate
//!
//! Key material is wiped from memory when these values drop.

use zeroize::Zeroizing;

use crate::consts::KEY_LEN;

/// 256-bit effective store key
pub type StoreKey32 = Zeroizing<[u8; KEY_LEN]>;

/// Decrypted value bytes
pub type PlainText = Zeroizing<Vec<u8>>;
