use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: malformed blob, wrong key, or tampered ciphertext")]
    DecryptionFailed,
}

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Could not determine application data directory")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored key is malformed: {0}")]
    MalformedKey(String),

    #[error("Key store lock poisoned")]
    Poisoned,
}
