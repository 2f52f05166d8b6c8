use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::constants::{CHAT_KEY_SIZE, NONCE_SIZE};
use crate::error::CryptoError;

pub type ChatKey = [u8; CHAT_KEY_SIZE];

pub fn generate_chat_key() -> ChatKey {
    let mut key = [0u8; CHAT_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// Returns base64(nonce || ciphertext), 24-byte nonce prepended.
// A fresh nonce is drawn per call, so encrypting the same plaintext
// twice never yields the same blob.
pub fn encrypt(key: &ChatKey, plaintext: &str) -> Result<String, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(output))
}

pub fn decrypt(key: &ChatKey, blob: &str) -> Result<String, CryptoError> {
    let data = BASE64
        .decode(blob)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    if data.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_chat_key();
        let plaintext = "Found your keys near the fountain!";

        let encrypted = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = generate_chat_key();
        let encrypted = encrypt(&key, "").unwrap();
        assert_eq!(decrypt(&key, &encrypted).unwrap(), "");
    }

    #[test]
    fn test_max_length_roundtrip() {
        let key = generate_chat_key();
        let plaintext: String = "é".repeat(2000);

        let encrypted = encrypt(&key, &plaintext).unwrap();
        assert_eq!(decrypt(&key, &encrypted).unwrap(), plaintext);
    }

    #[test]
    fn test_same_input_different_blobs() {
        let key = generate_chat_key();
        let a = encrypt(&key, "hello").unwrap();
        let b = encrypt(&key, "hello").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = generate_chat_key();
        let key2 = generate_chat_key();

        let encrypted = encrypt(&key1, "secret meeting point").unwrap();
        assert!(decrypt(&key2, &encrypted).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = generate_chat_key();
        let encrypted = encrypt(&key, "important data").unwrap();

        let mut raw = BASE64.decode(&encrypted).unwrap();
        let len = raw.len();
        raw[len - 1] ^= 0xFF;
        let tampered = BASE64.encode(raw);

        assert!(decrypt(&key, &tampered).is_err());
    }

    #[test]
    fn test_short_blob_fails() {
        let key = generate_chat_key();
        // Shorter than the nonce
        let short = BASE64.encode([0u8; NONCE_SIZE - 1]);
        assert!(decrypt(&key, &short).is_err());
        assert!(decrypt(&key, "").is_err());
    }

    #[test]
    fn test_invalid_base64_fails() {
        let key = generate_chat_key();
        assert!(decrypt(&key, "not base64 at all!!!").is_err());
    }
}
