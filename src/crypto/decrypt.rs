// src/crypto/decrypt.rs
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::consts::{KEY_LEN, NONCE_LEN};
use crate::error::CryptoError;

use super::Result;

/// Open a `nonce || ciphertext || tag` payload produced by [`super::encrypt`]
pub fn decrypt(payload: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKey { len: key.len() });
    }
    if payload.len() < NONCE_LEN {
        return Err(CryptoError::CiphertextTooShort { len: payload.len() });
    }
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey { len: key.len() })?;

    let (nonce, sealed) = payload.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
