// src/crypto/sealer.rs
//! Value sealing strategy chosen once per secret

use crate::aliases::StoreKey32;

use super::{decrypt, derive_key, encrypt, Result};

/// How stored values are protected at rest
pub enum ValueSealer {
    /// Values are stored as the caller's raw bytes
    Plain,
    /// Values are stored as `nonce || ciphertext || tag` under the effective key
    Encrypted(StoreKey32),
}

impl ValueSealer {
    /// `None` selects [`ValueSealer::Plain`]; any secret, even an empty one,
    /// selects [`ValueSealer::Encrypted`] with its derived key.
    pub fn from_secret(secret: Option<&[u8]>) -> Self {
        match secret {
            Some(secret) => Self::Encrypted(derive_key(secret)),
            None => Self::Plain,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }

    /// Bytes to write for `value`
    pub fn seal(&self, value: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Plain => Ok(value.to_vec()),
            Self::Encrypted(key) => encrypt(value, key.as_slice()),
        }
    }

    /// Caller bytes recovered from a stored value
    pub fn open(&self, stored: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Plain => Ok(stored.to_vec()),
            Self::Encrypted(key) => decrypt(stored, key.as_slice()),
        }
    }
}

impl std::fmt::Debug for ValueSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => f.write_str("Plain"),
            Self::Encrypted(_) => f.write_str("Encrypted(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;

    #[test]
    fn plain_passes_bytes_through() {
        let sealer = ValueSealer::from_secret(None);
        assert!(!sealer.is_encrypted());
        assert_eq!(sealer.seal(b"abc").unwrap(), b"abc");
        assert_eq!(sealer.open(b"abc").unwrap(), b"abc");
    }

    #[test]
    fn encrypted_round_trips_and_hides_plaintext() {
        let sealer = ValueSealer::from_secret(Some(b"secret"));
        let stored = sealer.seal(b"hello world").unwrap();
        assert_ne!(stored.as_slice(), b"hello world");
        assert_eq!(sealer.open(&stored).unwrap(), b"hello world");
    }

    #[test]
    fn different_secret_cannot_open() {
        let stored = ValueSealer::from_secret(Some(b"one"))
            .seal(b"payload")
            .unwrap();
        let err = ValueSealer::from_secret(Some(b"two"))
            .open(&stored)
            .unwrap_err();
        assert_eq!(err, CryptoError::AuthenticationFailed);
    }

    #[test]
    fn debug_never_prints_key() {
        let sealer = ValueSealer::from_secret(Some(b"top secret"));
        assert_eq!(format!("{sealer:?}"), "Encrypted(..)");
    }
}
