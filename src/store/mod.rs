//! Object Store (component C, spec.md §4.3).
//!
//! A single-process document store mapped onto the SVault data directory,
//! organised into three named collections: `vaults`, `vault_keys`, `files`.
//! Every public method takes the store's process-wide mutex for its full
//! duration, giving linearisable semantics across however many threads call
//! in (spec.md §5) — the Mount Adapter's kernel-driven worker threads among
//! them.
//!
//! The store is meant to be opened exactly once per process and the handle
//! shared (spec.md §9's "singleton store" design note): rather than a
//! global, this crate hands the constructed `Store` to the Vault Manager
//! and Mount Adapter explicitly.

pub mod db;
pub mod models;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use models::{File, Vault, VaultKey};

use crate::errors::{Result, SVaultError};

const STORE_FILE_NAME: &str = "svault.db";

/// The object store handle. Clone-free by design — callers share one
/// `Store` (typically behind an `Arc`) rather than opening several.
pub struct Store {
    path: PathBuf,
    collections: Mutex<db::Collections>,
}

impl Store {
    /// Open (or create) the store backed by a file under `data_dir`.
    ///
    /// Pre-existing collections are tolerated silently; a missing file is
    /// treated as three empty collections, matching spec.md §4.3's
    /// "created if absent ... pre-existing collections are tolerated".
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(STORE_FILE_NAME);
        let collections = db::read(&path)?;
        log::debug!(
            "opened object store at {} ({} vaults, {} files)",
            path.display(),
            collections.vaults.len(),
            collections.files.len()
        );
        Ok(Self {
            path,
            collections: Mutex::new(collections),
        })
    }

    fn persist(&self, collections: &db::Collections) -> Result<()> {
        db::write(&self.path, collections)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, db::Collections> {
        match self.collections.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("object store mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    // -----------------------------------------------------------------
    // Vaults
    // -----------------------------------------------------------------

    /// Insert a new vault. Rejects if a vault with the same lowercased
    /// name already exists.
    pub fn save_vault(&self, vault: Vault) -> Result<()> {
        let mut collections = self.lock();
        let lower = vault.name.to_lowercase();
        if collections
            .vaults
            .iter()
            .any(|v| v.name.to_lowercase() == lower)
        {
            return Err(SVaultError::VaultExists(vault.name));
        }
        collections.vaults.push(vault);
        self.persist(&collections)
    }

    /// Fetch a vault by case-insensitive name.
    pub fn get_vault(&self, name: &str) -> Result<Vault> {
        let lower = name.to_lowercase();
        let collections = self.lock();
        collections
            .vaults
            .iter()
            .find(|v| v.name.to_lowercase() == lower)
            .cloned()
            .ok_or_else(|| SVaultError::VaultNotFound(name.to_string()))
    }

    /// Return all stored vaults (order unspecified).
    pub fn list_vaults(&self) -> Result<Vec<Vault>> {
        Ok(self.lock().vaults.clone())
    }

    /// Remove the vault document. Does not cascade — the caller (Vault
    /// Manager) is responsible for separately deleting its files and key.
    pub fn delete_vault(&self, name: &str) -> Result<()> {
        let lower = name.to_lowercase();
        let mut collections = self.lock();
        let before = collections.vaults.len();
        collections.vaults.retain(|v| v.name.to_lowercase() != lower);
        if collections.vaults.len() == before {
            return Err(SVaultError::VaultNotFound(name.to_string()));
        }
        self.persist(&collections)
    }

    // -----------------------------------------------------------------
    // Vault keys
    // -----------------------------------------------------------------

    /// Insert a vault key record. The caller ensures uniqueness (exactly
    /// one `VaultKey` per vault, per spec.md §3).
    pub fn save_vault_key(&self, key: VaultKey) -> Result<()> {
        let mut collections = self.lock();
        collections.vault_keys.push(key);
        self.persist(&collections)
    }

    /// Fetch the DEK for `vault`. `password` is advisory metadata only —
    /// this method does not itself check it (spec.md §9: authorisation is
    /// the Vault Manager's job, not the store's). Returns empty bytes if
    /// no key record exists for `vault`, per spec.md §4.3's operation
    /// table ("Returns the DEK bytes; empty bytes if absent").
    pub fn get_vault_key(&self, vault: &str, _password: &str) -> Result<Vec<u8>> {
        let lower = vault.to_lowercase();
        let collections = self.lock();
        Ok(collections
            .vault_keys
            .iter()
            .find(|k| k.vault.to_lowercase() == lower)
            .map(|k| k.dek.clone())
            .unwrap_or_default())
    }

    /// Remove the vault key record for `vault`, if any.
    pub fn delete_vault_key(&self, vault: &str) -> Result<()> {
        let lower = vault.to_lowercase();
        let mut collections = self.lock();
        collections.vault_keys.retain(|k| k.vault.to_lowercase() != lower);
        self.persist(&collections)
    }

    // -----------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------

    /// Insert a file record. Only the basename of `file.name` is stored.
    pub fn add_to_vault(&self, mut file: File) -> Result<()> {
        file.name = Path::new(&file.name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(file.name);

        let mut collections = self.lock();
        collections.files.push(file);
        self.persist(&collections)
    }

    /// Fetch a single file by vault + basename.
    pub fn get_vault_file(&self, vault: &str, name: &str) -> Result<File> {
        let lower = vault.to_lowercase();
        let collections = self.lock();
        collections
            .files
            .iter()
            .find(|f| f.vault.to_lowercase() == lower && f.name == name)
            .cloned()
            .ok_or_else(|| SVaultError::FileNotFound(name.to_string(), vault.to_string()))
    }

    /// Return all files stored under `vault`.
    pub fn list_vault_files(&self, vault: &str) -> Result<Vec<File>> {
        let lower = vault.to_lowercase();
        let collections = self.lock();
        Ok(collections
            .files
            .iter()
            .filter(|f| f.vault.to_lowercase() == lower)
            .cloned()
            .collect())
    }

    /// Delete the file(s) matching `name` within `vault`.
    pub fn delete_from_vault(&self, name: &str, vault: &str) -> Result<()> {
        let lower = vault.to_lowercase();
        let mut collections = self.lock();
        collections
            .files
            .retain(|f| !(f.vault.to_lowercase() == lower && f.name == name));
        self.persist(&collections)
    }
}
