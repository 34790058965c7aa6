use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in SVault core.
#[derive(Debug, Error)]
pub enum SVaultError {
    // --- Vault errors ---
    #[error("a vault named '{0}' already exists")]
    VaultExists(String),

    #[error("vault '{0}' not found")]
    VaultNotFound(String),

    #[error("password does not match the vault's stored hash")]
    PasswordMismatch,

    #[error("file '{0}' not found in vault '{1}'")]
    FileNotFound(String, String),

    // --- Crypto errors ---
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed — wrong key or corrupted ciphertext")]
    InvalidCiphertext,

    #[error("password hashing failed: {0}")]
    HashingFailed(String),

    // --- Object store errors ---
    #[error("object store error: {0}")]
    Store(String),

    #[error("could not locate the SVault data directory: {0}")]
    NoDataDir(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    // --- Mount adapter ---
    #[error("mount point '{0}' could not be created")]
    MountPointUnavailable(PathBuf),
}

/// Convenience type alias for SVault results.
pub type Result<T> = std::result::Result<T, SVaultError>;
