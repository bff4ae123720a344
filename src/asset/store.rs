//! Flat content-addressed object store: `files/<sha256 hex>`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;

use super::{AssetPath, AssetRecord, ContentHash, hash_file};

/// Writer for the content-addressed store directory.
///
/// Invariant: every file named `<hex>` holds exactly the bytes whose SHA-256
/// is `<hex>`. Objects are written under a temporary name and renamed into
/// place, so a crash never leaves a truncated file under a hash name.
pub struct ContentStore {
    dir: PathBuf,
    /// Objects written during this run.
    written: FxHashSet<ContentHash>,
    /// Every object referenced during this run, written or reused.
    referenced: FxHashSet<ContentHash>,
}

/// Whether `insert` copied bytes or found the object already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    Written,
    Existing,
}

impl ContentStore {
    /// Open (and create) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create store `{}`", dir.display()))?;
        Ok(Self {
            dir,
            written: FxHashSet::default(),
            referenced: FxHashSet::default(),
        })
    }

    /// Location of the object for `hash`.
    pub fn object_path(&self, hash: ContentHash) -> PathBuf {
        self.dir.join(hash.to_hex())
    }

    /// Hash `source`, store its bytes, and return the record for `path`.
    pub fn insert(&mut self, source: &Path, path: AssetPath) -> Result<(AssetRecord, Stored)> {
        let hash = hash_file(source)
            .with_context(|| format!("failed to hash `{}`", source.display()))?;
        let stored = self.write_object(source, hash)?;
        self.referenced.insert(hash);

        let record = AssetRecord {
            source: source.to_path_buf(),
            path,
            hash,
        };
        Ok((record, stored))
    }

    fn write_object(&mut self, source: &Path, hash: ContentHash) -> Result<Stored> {
        let target = self.object_path(hash);
        if target.is_file() {
            return Ok(Stored::Existing);
        }

        let partial = self.dir.join(format!(".{}.partial", hash.to_hex()));
        let staged = fs::copy(source, &partial)
            .with_context(|| format!("failed to copy `{}` into the store", source.display()))
            .and_then(|_| {
                fs::rename(&partial, &target)
                    .with_context(|| format!("failed to finalize object `{}`", target.display()))
            });
        if let Err(err) = staged {
            // Only hash-named objects may remain in the store.
            let _ = fs::remove_file(&partial);
            return Err(err);
        }

        self.written.insert(hash);
        Ok(Stored::Written)
    }

    /// Number of objects copied in this run.
    pub fn written_count(&self) -> usize {
        self.written.len()
    }

    /// Number of distinct objects referenced in this run.
    pub fn object_count(&self) -> usize {
        self.referenced.len()
    }
}
