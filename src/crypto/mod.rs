//! Cryptographic primitives for SVault (component B, spec.md §4.2).
//!
//! - AES-256-GCM authenticated encryption of file payloads (`encryption`)
//! - Argon2id password hashing/verification and DEK generation (`password`)

pub mod encryption;
pub mod password;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, hash_password, ...};
pub use encryption::{decrypt, encrypt};
pub use password::{
    generate_dek, hash_password, hash_password_with_params, verify_password, Argon2Params,
    DEK_LEN,
};
