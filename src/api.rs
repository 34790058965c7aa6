//! Core API facade (component F, spec.md §6) — the stable boundary an
//! out-of-scope CLI or UI layer calls into.

use std::path::Path;
use std::sync::Arc;

use crate::errors::Result;
use crate::mount;
use crate::store::{File, Store, Vault};
use crate::vault::VaultManager;

/// The public entry point wrapping vault lifecycle operations. One
/// `SVault` owns the singleton object store handle and hands it to the
/// `VaultManager` it wraps (spec.md §9's "singleton store" design note).
pub struct SVault {
    manager: VaultManager,
    store: Arc<Store>,
}

impl SVault {
    /// Open the object store under the SVault data directory and build the
    /// facade. Call this once per process.
    pub fn open() -> Result<Self> {
        let data_dir = crate::paths::data_dir()?;
        Self::open_at(&data_dir)
    }

    /// Open the object store at an explicit data directory. Exposed
    /// primarily for tests; production callers should use [`Self::open`].
    pub fn open_at(data_dir: &Path) -> Result<Self> {
        let store = Arc::new(Store::open(data_dir)?);
        Ok(Self {
            manager: VaultManager::new(Arc::clone(&store)),
            store,
        })
    }

    /// `Vault.Create(name, password)`.
    pub fn create(&self, name: &str, password: &str) -> Result<()> {
        self.manager.create(name, password)
    }

    /// `Vault.List()`.
    pub fn list(&self) -> Result<Vec<Vault>> {
        self.manager.list()
    }

    /// `Vault.Auth(name, password)`.
    pub fn auth(&self, name: &str, password: &str) -> Result<()> {
        self.manager.auth(name, password)
    }

    /// `Vault.Add(path, vault, password)`.
    pub fn add(&self, path: &Path, vault: &str, password: &str) -> Result<()> {
        self.manager.add(path, vault, password)
    }

    /// `Vault.DeleteFile(name, vault, password)`.
    pub fn delete_file(&self, name: &str, vault: &str, password: &str) -> Result<()> {
        self.manager.delete_file(name, vault, password)
    }

    /// `Vault.DeleteVault(vault, password)`.
    pub fn delete_vault(&self, vault: &str, password: &str) -> Result<()> {
        self.manager.delete_vault(vault, password)
    }

    /// `Vault.ListFileVaults(vault, password)`.
    pub fn list_file_vaults(&self, vault: &str, password: &str) -> Result<Vec<File>> {
        self.manager.list_file_vaults(vault, password)
    }

    /// `Mount(vault, password)` — blocks until unmounted.
    pub fn mount(&self, vault: &str, password: &str) -> Result<()> {
        mount::mount(Arc::clone(&self.store), vault, password)
    }
}
