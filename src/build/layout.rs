//! Source and build directory contracts.
//!
//! ```text
//! source/                               build/
//! ├── assets/**                         ├── assignment-client/
//! ├── entities/models.json              │   ├── assets/map.json
//! ├── domain-server/config.json         │   ├── assets/files/<sha256>
//! └── content-version.txt               │   └── entities/models.json.gz
//!                                       ├── domain-server/config.json
//!                                       └── content-version.txt
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Paths inside the source tree.
#[derive(Debug, Clone)]
pub struct SourceLayout {
    pub assets: PathBuf,
    pub entities: PathBuf,
    pub domain_config: PathBuf,
    pub content_version: PathBuf,
}

impl SourceLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            assets: root.join("assets"),
            entities: root.join("entities").join("models.json"),
            domain_config: root.join("domain-server").join("config.json"),
            content_version: root.join("content-version.txt"),
        }
    }
}

/// Paths inside the build directory.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    pub root: PathBuf,
    pub assignment_client: PathBuf,
    pub asset_map: PathBuf,
    pub files: PathBuf,
    pub entities: PathBuf,
    pub domain_config: PathBuf,
    pub content_version: PathBuf,
}

impl BuildLayout {
    pub fn new(root: &Path) -> Self {
        let assignment_client = root.join("assignment-client");
        let assets = assignment_client.join("assets");
        Self {
            root: root.to_path_buf(),
            asset_map: assets.join("map.json"),
            files: assets.join("files"),
            entities: assignment_client.join("entities").join("models.json.gz"),
            assignment_client,
            domain_config: root.join("domain-server").join("config.json"),
            content_version: root.join("content-version.txt"),
        }
    }

    /// Create every directory the build writes into.
    pub fn create(&self) -> Result<()> {
        let dirs = [
            Some(self.files.as_path()),
            self.entities.parent(),
            self.domain_config.parent(),
        ];
        for dir in dirs.into_iter().flatten() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create `{}`", dir.display()))?;
        }
        Ok(())
    }

    /// Top-level entries a distribution archive carries, in order.
    pub fn archive_entries(&self) -> [&Path; 3] {
        [
            self.assignment_client.as_path(),
            self.domain_config.parent().unwrap_or(&self.root),
            self.content_version.as_path(),
        ]
    }
}
