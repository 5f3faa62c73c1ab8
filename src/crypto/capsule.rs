// src/crypto/capsule.rs
//! Self-describing JSON envelope around a Cryptor payload
//!
//! Wire form: `{"cipher":"<standard base64 of nonce || ciphertext || tag>"}`.
//! The plaintext half of a capsule never leaves memory.

use serde::{Deserialize, Serialize};

use crate::aliases::{PlainText, StoreKey32};

use super::{decrypt, encrypt, get_random_key, Result};

#[derive(Default, Serialize, Deserialize)]
pub struct Capsule {
    #[serde(skip)]
    plain: PlainText,
    #[serde(with = "b64")]
    cipher: Vec<u8>,
}

impl Capsule {
    pub fn new(plain: &[u8]) -> Self {
        Self {
            plain: PlainText::new(plain.to_vec()),
            cipher: Vec::new(),
        }
    }

    /// Seal the held plaintext under `key`, replacing any previous payload
    pub fn encrypt(&mut self, key: &[u8]) -> Result<()> {
        self.cipher = encrypt(&self.plain, key)?;
        Ok(())
    }

    /// Seal under a freshly generated key and hand that key back
    pub fn encrypt_with_new_key(&mut self) -> Result<StoreKey32> {
        let key = get_random_key()?;
        self.encrypt(key.as_slice())?;
        Ok(key)
    }

    /// Open the held payload, keeping the plaintext in the capsule
    pub fn decrypt(&mut self, key: &[u8]) -> Result<&[u8]> {
        self.plain = PlainText::new(decrypt(&self.cipher, key)?);
        Ok(self.plain.as_slice())
    }

    pub fn cipher(&self) -> &[u8] {
        &self.cipher
    }

    pub fn to_json_bytes(&self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl std::fmt::Debug for Capsule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capsule")
            .field("cipher_len", &self.cipher.len())
            .finish_non_exhaustive()
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
