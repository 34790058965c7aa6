//! Password hashing/verification and data-encryption-key generation.
//!
//! Two independent uses of randomness live here and must never be confused:
//! - `hash_password` turns a user password into a self-describing Argon2id
//!   PHC string (salt and parameters travel with the hash) used only for
//!   *authentication*.
//! - `generate_dek` produces a DEK with no relationship to any password;
//!   it is the key actually used to encrypt file payloads (spec.md §3:
//!   "DEK is cryptographically independent of the password").

use argon2::password_hash::rand_core::OsRng as PhcOsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::errors::{Result, SVaultError};

/// Length of a generated data encryption key, in bytes.
pub const DEK_LEN: usize = 32;

/// Configurable Argon2id parameters for password hashing.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    fn build(self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| SVaultError::HashingFailed(format!("invalid Argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Generate a cryptographically random 32-byte data encryption key.
pub fn generate_dek() -> Result<[u8; DEK_LEN]> {
    let mut dek = [0u8; DEK_LEN];
    rand::rngs::OsRng.fill_bytes(&mut dek);
    Ok(dek)
}

/// Hash `password` with Argon2id using the default parameters.
///
/// Returns a PHC-formatted string with the salt and parameters embedded,
/// so no separate salt needs to be stored alongside it.
pub fn hash_password(password: &[u8]) -> Result<String> {
    hash_password_with_params(password, Argon2Params::default())
}

/// Hash `password` with Argon2id using explicit parameters.
pub fn hash_password_with_params(password: &[u8], params: Argon2Params) -> Result<String> {
    let argon2 = params.build()?;
    let salt = SaltString::generate(&mut PhcOsRng);

    let hash = argon2
        .hash_password(password, &salt)
        .map_err(|e| SVaultError::HashingFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(hash.to_string())
}

/// Verify `password` against a PHC-formatted hash produced by
/// `hash_password`. Uses Argon2's constant-time comparison internally.
pub fn verify_password(password: &[u8], stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| SVaultError::HashingFailed(format!("malformed password hash: {e}")))?;

    match Argon2::default().verify_password(password, &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(SVaultError::HashingFailed(format!(
            "password verification failed: {e}"
        ))),
    }
}
