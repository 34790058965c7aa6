//! Mount Adapter (component E, spec.md §4.5).
//!
//! Presents one authenticated vault as a flat, read-only directory via a
//! user-space filesystem. Gated behind the `mount` feature (default-on),
//! since FUSE bindings are not available on every target — mirroring how
//! the teacher gates the OS keyring behind its own `keyring-store` feature.

#[cfg(feature = "mount")]
mod fs;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::errors::Result;
use crate::store::Store;
use crate::vault;

#[cfg(feature = "mount")]
pub use fs::SVaultFs;

/// Build the mount point path for `vault`:
/// `<temp dir>/svault-<vault>-<yyyyMMddHHmmss>` (spec.md §4.5).
pub fn mount_point_for(vault: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    std::env::temp_dir().join(format!("svault-{vault}-{stamp}"))
}

#[cfg(all(feature = "mount", unix))]
fn create_mount_point(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .mode(0o755)
        .create(path)
        .map_err(crate::errors::SVaultError::Io)
}

#[cfg(all(feature = "mount", not(unix)))]
fn create_mount_point(path: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(crate::errors::SVaultError::Io)
}

/// Authenticate against `vault_name`, mount it read-only at a fresh temp
/// directory, launch a platform file explorer there, then block in the
/// filesystem host loop until the caller (or the user) unmounts it.
/// Unmounting releases the host handle but leaves the temp directory on
/// disk, per spec.md §4.5.
#[cfg(feature = "mount")]
pub fn mount(store: Arc<Store>, vault_name: &str, password: &str) -> Result<()> {
    vault::check_auth(&store, vault_name, password)?;

    let mount_point = mount_point_for(vault_name);
    create_mount_point(&mount_point)?;
    log::info!(
        "mounting vault '{vault_name}' at {}",
        mount_point.display()
    );

    if let Err(e) = open::that(&mount_point) {
        log::warn!(
            "could not launch a file explorer at {}: {e}",
            mount_point.display()
        );
    }

    let filesystem = SVaultFs::new(
        store,
        vault_name.to_string(),
        zeroize::Zeroizing::new(password.to_string()),
    );

    fuser::mount2(
        filesystem,
        &mount_point,
        &[
            fuser::MountOption::RO,
            fuser::MountOption::FSName("svault".to_string()),
        ],
    )
    .map_err(crate::errors::SVaultError::Io)
}

#[cfg(not(feature = "mount"))]
pub fn mount(_store: Arc<Store>, _vault_name: &str, _password: &str) -> Result<()> {
    Err(crate::errors::SVaultError::Store(
        "this build was compiled without the `mount` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn mount_point_naming_matches_spec_pattern() {
        let path = mount_point_for("personal");
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("svault-personal-"));

        let stamp = name.strip_prefix("svault-personal-").unwrap();
        assert_eq!(stamp.len(), 14, "expected yyyyMMddHHmmss");
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[cfg(feature = "mount")]
    #[test]
    fn mount_rejects_wrong_password_before_touching_the_filesystem() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let manager = vault::VaultManager::new(Arc::clone(&store));
        manager.create("personal", "pw1").unwrap();

        let err = mount(store, "personal", "wrong").unwrap_err();
        assert!(matches!(err, crate::errors::SVaultError::PasswordMismatch));
    }
}
