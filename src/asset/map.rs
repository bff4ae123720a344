//! Asset map (`map.json`): canonical asset path to content hash.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{AssetPath, AssetRecord, ContentHash};
use crate::{debug, log};

/// Outcome of recording one `(path, hash)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First mapping for this path.
    Inserted,
    /// Same path, same hash: benign.
    Duplicate,
    /// Same path, different hash: the new hash replaced `previous`.
    Overwritten { previous: ContentHash },
}

/// A path whose earlier mapping was replaced.
///
/// The earlier object stays in the store but is no longer referenced by the
/// map under this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    pub path: AssetPath,
    pub previous: ContentHash,
    pub current: ContentHash,
}

/// Accumulates records during the asset walk. Finalized once by `finish`.
#[derive(Debug, Default)]
pub struct AssetMapBuilder {
    entries: BTreeMap<AssetPath, ContentHash>,
    duplicates: usize,
    overwrites: Vec<Overwrite>,
    verbose: bool,
}

impl AssetMapBuilder {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// Record a stored asset. Last write wins on conflicting hashes.
    pub fn record(&mut self, record: &AssetRecord) -> Recorded {
        let Some(previous) = self.entries.insert(record.path.clone(), record.hash) else {
            return Recorded::Inserted;
        };

        if previous == record.hash {
            self.duplicates += 1;
            debug!(self.verbose, "map"; "duplicate entry {} ({})", record.path, record.hash);
            return Recorded::Duplicate;
        }

        log!(
            "warning";
            "{} overwritten: {} -> {} (from {})",
            record.path,
            previous,
            record.hash,
            record.source.display()
        );
        self.overwrites.push(Overwrite {
            path: record.path.clone(),
            previous,
            current: record.hash,
        });
        Recorded::Overwritten { previous }
    }

    /// Finish the walk, returning the map and the collision log.
    pub fn finish(self) -> (AssetMap, Collisions) {
        let collisions = Collisions {
            duplicates: self.duplicates,
            overwrites: self.overwrites,
        };
        (AssetMap(self.entries), collisions)
    }
}

/// Path collisions observed while building the map.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collisions {
    pub duplicates: usize,
    pub overwrites: Vec<Overwrite>,
}

/// Finalized asset map. Keys are sorted, so the output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct AssetMap(BTreeMap<AssetPath, ContentHash>);

impl AssetMap {
    #[cfg(test)]
    pub fn get(&self, path: &str) -> Option<ContentHash> {
        self.0.get(&AssetPath::parse(path)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indented JSON object, e.g. `{ "/models/chair.fbx": "ab12..." }`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize asset map")
    }

    /// Write the whole map in one call.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)
            .with_context(|| format!("failed to write asset map `{}`", path.display()))
    }
}
