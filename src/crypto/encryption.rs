//! AES-256-GCM authenticated encryption of file payloads.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `decrypt` splits the nonce back out
//! before decrypting.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{Result, SVaultError};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Encrypt `plaintext` with a 32-byte data encryption key.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext || tag).
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| SVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| SVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data that was produced by `encrypt`.
///
/// Expects the first 12 bytes to be the nonce, followed by the ciphertext
/// and its GCM auth tag.
pub fn decrypt(blob: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(SVaultError::InvalidCiphertext);
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SVaultError::InvalidCiphertext)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| SVaultError::InvalidCiphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = [0xABu8; 32];
        let plaintext = b"hello world";

        let ciphertext = encrypt(plaintext, &key).expect("encrypt should succeed");
        assert!(ciphertext.len() > plaintext.len());

        let recovered = decrypt(&ciphertext, &key).expect("decrypt should succeed");
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn encrypt_produces_different_ciphertext_each_time() {
        let key = [0xCDu8; 32];
        let plaintext = b"same bytes every time";

        let ct1 = encrypt(plaintext, &key).unwrap();
        let ct2 = encrypt(plaintext, &key).unwrap();

        assert_ne!(ct1, ct2, "nonce reuse would defeat GCM's security");
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let key = [0x11u8; 32];
        let wrong_key = [0x22u8; 32];
        let plaintext = b"top secret";

        let ciphertext = encrypt(plaintext, &key).unwrap();
        assert!(decrypt(&ciphertext, &wrong_key).is_err());
    }

    #[test]
    fn decrypt_with_truncated_data_fails() {
        let key = [0xAAu8; 32];
        assert!(decrypt(&[0u8; 5], &key).is_err());
    }

    #[test]
    fn decrypt_with_corrupted_ciphertext_fails() {
        let key = [0xBBu8; 32];
        let plaintext = b"do not tamper";

        let mut ciphertext = encrypt(plaintext, &key).unwrap();
        if let Some(byte) = ciphertext.get_mut(15) {
            *byte ^= 0xFF;
        }

        assert!(decrypt(&ciphertext, &key).is_err());
    }
}
