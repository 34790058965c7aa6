//! On-disk envelope for the object store.
//!
//! A `.svaultdb` file has this layout, generalized from the teacher's
//! single-section `.vault` envelope (`vault::format` in the teacher) to
//! three length-prefixed JSON sections, one per collection:
//!
//! ```text
//! [SVDB: 4 bytes][version: 1 byte]
//! [vaults_len: 4 bytes LE][vaults JSON]
//! [vault_keys_len: 4 bytes LE][vault_keys JSON]
//! [files_len: 4 bytes LE][files JSON]
//! ```
//!
//! Unlike the teacher's format there is no HMAC tag: the teacher's HMAC key
//! is derived from the single master key that also encrypts the vault's
//! secrets, but the object store holds *many* vaults, each with its own
//! independent DEK, so there is no single key to tie a store-wide integrity
//! tag to. Per-file confidentiality and integrity is already provided by
//! the AEAD tag on each `File.data` blob (spec.md §4.2); this envelope only
//! needs to survive a crash mid-write, which the atomic rename below
//! handles.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SVaultError};
use crate::store::models::{File, Vault, VaultKey};

const MAGIC: &[u8; 4] = b"SVDB";
const CURRENT_VERSION: u8 = 1;

/// In-memory contents of the three collections.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Collections {
    pub vaults: Vec<Vault>,
    pub vault_keys: Vec<VaultKey>,
    pub files: Vec<File>,
}

/// Read the collections file at `path`. Returns empty collections if the
/// file does not exist yet (first run — the store creates the file lazily
/// on first write, matching spec.md §4.3's "created if absent").
pub fn read(path: &Path) -> Result<Collections> {
    if !path.exists() {
        return Ok(Collections::default());
    }

    let data = fs::read(path)?;
    if data.len() < 5 {
        return Err(SVaultError::Store("store file too small to be valid".into()));
    }
    if &data[0..4] != MAGIC {
        return Err(SVaultError::Store("missing SVDB magic bytes".into()));
    }
    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(SVaultError::Store(format!(
            "unsupported store format version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let mut offset = 5;
    let vaults = read_section(&data, &mut offset)?;
    let vault_keys = read_section(&data, &mut offset)?;
    let files = read_section(&data, &mut offset)?;

    Ok(Collections {
        vaults,
        vault_keys,
        files,
    })
}

/// Write the collections file atomically: serialize to a temp file in the
/// same directory, then rename over the target so readers never observe a
/// half-written file.
pub fn write(path: &Path, collections: &Collections) -> Result<()> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    write_section(&mut buf, &collections.vaults)?;
    write_section(&mut buf, &collections.vault_keys)?;
    write_section(&mut buf, &collections.files)?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, &buf)?;
    fs::rename(&tmp_path, path)?;

    Ok(())
}

fn write_section<T: Serialize>(buf: &mut Vec<u8>, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| SVaultError::Serialization(format!("encoding store section: {e}")))?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| SVaultError::Serialization("store section exceeds u32::MAX".into()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&bytes);
    Ok(())
}

fn read_section<T: for<'de> Deserialize<'de>>(data: &[u8], offset: &mut usize) -> Result<T> {
    if *offset + 4 > data.len() {
        return Err(SVaultError::Store("truncated store section length".into()));
    }
    let len_bytes: [u8; 4] = data[*offset..*offset + 4]
        .try_into()
        .map_err(|_| SVaultError::Store("malformed store section length".into()))?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    *offset += 4;

    if *offset + len > data.len() {
        return Err(SVaultError::Store("truncated store section body".into()));
    }
    let section = &data[*offset..*offset + len];
    *offset += len;

    serde_json::from_slice(section)
        .map_err(|e| SVaultError::Store(format!("decoding store section: {e}")))
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
