// src/crypto/key.rs
//! Key material: effective-key derivation and random key generation

use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::aliases::StoreKey32;
use crate::consts::KEY_LEN;
use crate::error::CryptoError;

use super::Result;

/// Turn caller-supplied secret material into the 32-byte effective key.
///
/// Secrets shorter than 32 bytes are replaced by their SHA-256 digest.
/// Longer secrets are used as-is and only the first 32 bytes count.
pub fn derive_key(secret: &[u8]) -> StoreKey32 {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    if secret.len() < KEY_LEN {
        tracing::trace!("secret shorter than {KEY_LEN} bytes, using its SHA-256 digest");
        key.copy_from_slice(&Sha256::digest(secret));
    } else {
        key.copy_from_slice(&secret[..KEY_LEN]);
    }
    key
}

/// Generate a fresh 256-bit key from the OS entropy source
pub fn get_random_key() -> Result<StoreKey32> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    OsRng
        .try_fill_bytes(&mut key[..])
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(key)
}
