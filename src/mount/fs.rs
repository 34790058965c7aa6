//! The `fuser::Filesystem` implementation backing the Mount Adapter.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use libc::{ENOENT, EROFS};
use zeroize::Zeroizing;

use crate::crypto;
use crate::errors::Result;
use crate::store::{File as StoredFile, Store};

/// FUSE's well-known root inode number.
const ROOT_INO: u64 = 1;
/// First inode handed out to a stored file. Inode numbers are assigned
/// once per basename and never reused within a mount session, even if the
/// underlying file is later deleted.
const FIRST_FILE_INO: u64 = 2;
/// How long the kernel may cache attributes/entries before re-asking.
const TTL: std::time::Duration = std::time::Duration::from_secs(1);

/// Maps stored file basenames to stable inode numbers for one mount
/// session. FUSE addresses files by inode; SVault's own model addresses
/// them by basename — this is the glue between the two, built the way
/// `casouri-monovault` keeps its own inode table over a document-backed
/// file set.
#[derive(Default)]
struct Inodes {
    next: u64,
    name_to_ino: HashMap<String, u64>,
    ino_to_name: HashMap<u64, String>,
}

impl Inodes {
    fn new() -> Self {
        Self {
            next: FIRST_FILE_INO,
            ..Default::default()
        }
    }

    fn ino_for(&mut self, name: &str) -> u64 {
        if let Some(ino) = self.name_to_ino.get(name) {
            return *ino;
        }
        let ino = self.next;
        self.next += 1;
        self.name_to_ino.insert(name.to_string(), ino);
        self.ino_to_name.insert(ino, name.to_string());
        ino
    }

    fn name_for(&self, ino: u64) -> Option<String> {
        self.ino_to_name.get(&ino).cloned()
    }
}

/// Presents one authenticated vault as a flat, read-only directory
/// (component E, spec.md §4.5). State carried: the target vault, the
/// password (for DEK lookups — never re-checked per call, since `Mount`
/// already authenticated once), and a handle to the Object Store.
pub struct SVaultFs {
    store: Arc<Store>,
    vault: String,
    password: Zeroizing<String>,
    inodes: Mutex<Inodes>,
    /// Per-open plaintext cache keyed by basename. The spec permits but
    /// does not require this (spec.md §4.5, §9 Open Questions); it avoids
    /// re-running AEAD decryption on every sequential `read()` the kernel
    /// issues for one file. Scoped to this `SVaultFs` instance, i.e. to a
    /// single mount — a fresh `Mount` call gets a fresh, empty cache.
    plaintext_cache: Mutex<HashMap<String, Vec<u8>>>,
}

impl SVaultFs {
    pub fn new(store: Arc<Store>, vault: String, password: Zeroizing<String>) -> Self {
        Self {
            store,
            vault,
            password,
            inodes: Mutex::new(Inodes::new()),
            plaintext_cache: Mutex::new(HashMap::new()),
        }
    }

    fn root_attr(&self) -> FileAttr {
        let now = SystemTime::now();
        FileAttr {
            ino: ROOT_INO,
            size: 0,
            blocks: 0,
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind: FileType::Directory,
            perm: 0o755,
            nlink: 2,
            uid: 0,
            gid: 0,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    fn file_attr(&self, ino: u64, file: &StoredFile) -> FileAttr {
        let mtime: SystemTime = file.mod_time.into();
        FileAttr {
            ino,
            size: file.size,
            blocks: (file.size + 511) / 512,
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: mtime,
            kind: FileType::RegularFile,
            perm: (file.mode & 0o777) as u16,
            nlink: 1,
            uid: 0,
            gid: 0,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    fn lookup_file(&self, name: &str) -> Option<StoredFile> {
        self.store.get_vault_file(&self.vault, name).ok()
    }

    fn decrypt_file(&self, file: &StoredFile) -> Result<Vec<u8>> {
        if let Some(cached) = self.plaintext_cache.lock().unwrap().get(&file.name) {
            return Ok(cached.clone());
        }
        let dek = self.store.get_vault_key(&self.vault, self.password.as_str())?;
        let plaintext = crypto::decrypt(&file.data, &dek)?;
        self.plaintext_cache
            .lock()
            .unwrap()
            .insert(file.name.clone(), plaintext.clone());
        Ok(plaintext)
    }
}

impl Filesystem for SVaultFs {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        if parent != ROOT_INO {
            reply.error(ENOENT);
            return;
        }
        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };
        match self.lookup_file(name) {
            Some(file) => {
                let ino = self.inodes.lock().unwrap().ino_for(name);
                reply.entry(&TTL, &self.file_attr(ino, &file), 0);
            }
            None => reply.error(ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        if ino == ROOT_INO {
            reply.attr(&TTL, &self.root_attr());
            return;
        }

        let Some(name) = self.inodes.lock().unwrap().name_for(ino) else {
            reply.error(ENOENT);
            return;
        };

        match self.lookup_file(&name) {
            Some(file) => reply.attr(&TTL, &self.file_attr(ino, &file)),
            None => reply.error(ENOENT),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if ino != ROOT_INO {
            reply.error(ENOENT);
            return;
        }

        let files = match self.store.list_vault_files(&self.vault) {
            Ok(files) => files,
            Err(e) => {
                log::warn!("readdir: {e}");
                reply.error(ENOENT);
                return;
            }
        };

        let mut entries = vec![
            (ROOT_INO, FileType::Directory, ".".to_string()),
            (ROOT_INO, FileType::Directory, "..".to_string()),
        ];
        {
            let mut inodes = self.inodes.lock().unwrap();
            for file in &files {
                let ino = inodes.ino_for(&file.name);
                entries.push((ino, FileType::RegularFile, file.name.clone()));
            }
        }

        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            // `add` returns true once the reply buffer is full.
            if reply.add(ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request, _ino: u64, _flags: i32, reply: ReplyOpen) {
        reply.opened(0, 0);
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(name) = self.inodes.lock().unwrap().name_for(ino) else {
            reply.error(ENOENT);
            return;
        };

        let Some(file) = self.lookup_file(&name) else {
            reply.error(ENOENT);
            return;
        };

        let plaintext = match self.decrypt_file(&file) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("read: decrypting '{name}' failed: {e}");
                reply.error(ENOENT);
                return;
            }
        };

        let offset = offset as usize;
        if offset >= plaintext.len() {
            reply.data(&[]);
            return;
        }

        let end = (offset + size as usize).min(plaintext.len());
        reply.data(&plaintext[offset..end]);
    }

    // --- Everything below is a write-shaped operation: SVault mounts are
    // --- read-only (spec.md §4.5 Non-goals: no streaming writes). ---

    fn write(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        reply.error(EROFS);
    }

    fn create(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        reply.error(EROFS);
    }

    fn unlink(&mut self, _req: &Request, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(EROFS);
    }

    fn rename(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(EROFS);
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // Truncation is a write; reject it outright. A bare attribute
        // refresh (no size change) is let through as a getattr so that
        // tools which `fstat` before reading don't get spuriously denied.
        if size.is_some() {
            reply.error(EROFS);
            return;
        }

        if ino == ROOT_INO {
            reply.attr(&TTL, &self.root_attr());
            return;
        }

        let resolved = self
            .inodes
            .lock()
            .unwrap()
            .name_for(ino)
            .and_then(|n| self.lookup_file(&n));

        match resolved {
            Some(file) => reply.attr(&TTL, &self.file_attr(ino, &file)),
            None => reply.error(ENOENT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Store, Vault, VaultKey};
    use chrono::Utc;

    fn fixture() -> (tempfile::TempDir, SVaultFs) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());

        store
            .save_vault(Vault {
                name: "v".into(),
                password_hash: crypto::hash_password(b"pw").unwrap(),
                created_at: Utc::now(),
            })
            .unwrap();
        let dek = crypto::generate_dek().unwrap();
        store
            .save_vault_key(VaultKey {
                vault: "v".into(),
                dek: dek.to_vec(),
                password_hash: "irrelevant".into(),
            })
            .unwrap();

        let ciphertext = crypto::encrypt(b"hello world", &dek).unwrap();
        store
            .add_to_vault(StoredFile {
                vault: "v".into(),
                name: "greeting.txt".into(),
                data: ciphertext,
                size: 11,
                mode: 0o644,
                mod_time: Utc::now(),
            })
            .unwrap();

        let fs = SVaultFs::new(store, "v".into(), Zeroizing::new("pw".into()));
        (dir, fs)
    }

    #[test]
    fn inode_assignment_is_stable() {
        let mut inodes = Inodes::new();
        let a = inodes.ino_for("a.txt");
        let b = inodes.ino_for("b.txt");
        assert_ne!(a, b);
        assert_eq!(inodes.ino_for("a.txt"), a);
        assert_eq!(inodes.name_for(a).as_deref(), Some("a.txt"));
    }

    #[test]
    fn lookup_file_resolves_stored_basename() {
        let (_dir, fs) = fixture();
        let file = fs.lookup_file("greeting.txt").expect("file present");
        assert_eq!(file.size, 11);
    }

    #[test]
    fn lookup_file_missing_name_is_none() {
        let (_dir, fs) = fixture();
        assert!(fs.lookup_file("nope.txt").is_none());
    }

    #[test]
    fn decrypt_file_returns_plaintext_and_caches() {
        let (_dir, fs) = fixture();
        let file = fs.lookup_file("greeting.txt").unwrap();

        let first = fs.decrypt_file(&file).unwrap();
        assert_eq!(first, b"hello world");

        // Second call should hit the cache and return the same bytes.
        let second = fs.decrypt_file(&file).unwrap();
        assert_eq!(second, b"hello world");
        assert!(fs.plaintext_cache.lock().unwrap().contains_key("greeting.txt"));
    }

    #[test]
    fn file_attr_uses_stored_size_and_mode() {
        let (_dir, fs) = fixture();
        let file = fs.lookup_file("greeting.txt").unwrap();
        let attr = fs.file_attr(7, &file);
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.size, 11);
        assert_eq!(attr.perm, 0o644);
        assert_eq!(attr.kind, FileType::RegularFile);
    }

    #[test]
    fn root_attr_is_a_directory() {
        let (_dir, fs) = fixture();
        let attr = fs.root_attr();
        assert_eq!(attr.ino, ROOT_INO);
        assert_eq!(attr.kind, FileType::Directory);
    }
}
