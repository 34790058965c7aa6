//! Document records persisted by the object store (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::db::{base64_decode, base64_encode};

/// A named, password-protected vault.
///
/// Immutable once created: the only operations that touch a `Vault` record
/// are `SaveVault` (insert) and `DeleteVault` (remove) — there is no update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    /// Case-insensitive unique identifier, stored lowercased.
    pub name: String,
    /// Opaque Argon2id PHC hash — never the plaintext password.
    pub password_hash: String,
    /// Wall-clock timestamp at creation.
    pub created_at: DateTime<Utc>,
}

/// The data encryption key belonging to one vault.
///
/// Exactly one `VaultKey` exists per `Vault`. The DEK is independent of the
/// password: compromising the password hash does not expose the DEK, and
/// vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultKey {
    /// Name of the owning vault.
    pub vault: String,
    /// 32-byte data encryption key, base64-encoded in JSON.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub dek: Vec<u8>,
    /// Authorisation witness — same hash as the owning `Vault` record.
    /// `GetVaultKey` does not itself check this; authorisation happens in
    /// the Vault Manager (spec.md §9 design note).
    pub password_hash: String,
}

/// One encrypted file stored inside a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// Owning vault name.
    pub vault: String,
    /// File basename — directory components are stripped before storage.
    pub name: String,
    /// AEAD ciphertext, prefixed with its nonce. Base64-encoded in JSON.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub data: Vec<u8>,
    /// Plaintext size in bytes (not the ciphertext length).
    pub size: u64,
    /// POSIX-style permission/type bits of the original file.
    pub mode: u32,
    /// Modification timestamp of the original file.
    pub mod_time: DateTime<Utc>,
}
