// tests/crypto_tests.rs
use std::collections::HashSet;

use encrypted_bucket_store::consts::{KEY_LEN, NONCE_LEN, TAG_LEN};
use encrypted_bucket_store::{decrypt, derive_key, encrypt, get_random_key, CryptoError};
use sha2::{Digest, Sha256};

#[test]
fn test_encrypt_decrypt_roundtrip_various_lengths() {
    let key = get_random_key().unwrap();
    for len in [0usize, 1, 15, 16, 17, 255, 4096, 65_537] {
        let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let payload = encrypt(&plaintext, key.as_slice()).unwrap();
        let decrypted = decrypt(&payload, key.as_slice()).unwrap();
        assert_eq!(plaintext, decrypted, "round trip failed for length {len}");
    }
}

#[test]
fn test_payload_layout_is_nonce_ciphertext_tag() {
    let key = [9u8; KEY_LEN];
    let plaintext = b"I like seafood.";
    let payload = encrypt(plaintext, &key).unwrap();

    assert_eq!(payload.len(), NONCE_LEN + plaintext.len() + TAG_LEN);
    assert_ne!(&payload[NONCE_LEN..NONCE_LEN + plaintext.len()], plaintext);
}

#[test]
fn test_same_plaintext_never_repeats_payload() {
    let key = get_random_key().unwrap();
    let plaintext = b"identical input every time";

    let mut payloads = HashSet::new();
    let mut nonces = HashSet::new();
    for _ in 0..1_000 {
        let payload = encrypt(plaintext, key.as_slice()).unwrap();
        nonces.insert(payload[..NONCE_LEN].to_vec());
        payloads.insert(payload);
    }
    assert_eq!(payloads.len(), 1_000);
    assert_eq!(nonces.len(), 1_000);
}

#[test]
fn test_flipping_any_byte_fails_authentication() {
    let key = get_random_key().unwrap();
    let payload = encrypt(b"tamper me", key.as_slice()).unwrap();

    for i in 0..payload.len() {
        let mut tampered = payload.clone();
        tampered[i] ^= 0x01;
        assert_eq!(
            decrypt(&tampered, key.as_slice()),
            Err(CryptoError::AuthenticationFailed),
            "byte {i} flip was not detected"
        );
    }
}

#[test]
fn test_truncated_payloads_are_rejected() {
    let key = get_random_key().unwrap();
    let payload = encrypt(b"some bytes", key.as_slice()).unwrap();

    assert_eq!(
        decrypt(&payload[..NONCE_LEN - 1], key.as_slice()),
        Err(CryptoError::CiphertextTooShort { len: NONCE_LEN - 1 })
    );
    assert_eq!(
        decrypt(&[], key.as_slice()),
        Err(CryptoError::CiphertextTooShort { len: 0 })
    );
    assert_eq!(
        decrypt(&payload[..NONCE_LEN], key.as_slice()),
        Err(CryptoError::AuthenticationFailed)
    );
    assert_eq!(
        decrypt(&payload[..payload.len() - 1], key.as_slice()),
        Err(CryptoError::AuthenticationFailed)
    );
}

#[test]
fn test_wrong_key_fails_authentication() {
    let payload = encrypt(b"secret", &[1u8; KEY_LEN]).unwrap();
    assert_eq!(
        decrypt(&payload, &[2u8; KEY_LEN]),
        Err(CryptoError::AuthenticationFailed)
    );
}

#[test]
fn test_key_length_is_enforced() {
    assert_eq!(
        encrypt(b"x", &[0u8; 16]),
        Err(CryptoError::InvalidKey { len: 16 })
    );
    let payload = encrypt(b"x", &[0u8; KEY_LEN]).unwrap();
    assert_eq!(
        decrypt(&payload, &[0u8; 31]),
        Err(CryptoError::InvalidKey { len: 31 })
    );
}

#[test]
fn test_random_keys_are_32_bytes_and_distinct() {
    let a = get_random_key().unwrap();
    let b = get_random_key().unwrap();
    assert_eq!(a.len(), KEY_LEN);
    assert_ne!(a.as_slice(), b.as_slice());
}

#[test]
fn test_derive_key_hashes_short_secrets_only() {
    assert_eq!(
        derive_key(b"secret").as_slice(),
        Sha256::digest(b"secret").as_slice()
    );

    let long = b"0123456789abcdef0123456789abcdef-and-more";
    assert_eq!(derive_key(long).as_slice(), &long[..KEY_LEN]);
}
