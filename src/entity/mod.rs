//! Entity document (`models.json`): skybox pre-scan, rewrite, gzip output.
//!
//! ```json
//! { "Entities": [ { "type": "Zone", "skybox": { "url": "atp:/zone1/skybox.png" } } ] }
//! ```
//!
//! Only `skybox.url` of `Zone` entities is ever modified. Key order of every
//! object is preserved through the rewrite.

mod skybox;

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rustc_hash::FxHashSet;
use serde_json::Value;
use thiserror::Error;

use crate::asset::AssetPath;

pub use skybox::{SkyboxSubstitutions, SkyboxSubstitutionsBuilder, atp_asset_path, atp_url};

const ENTITIES_KEY: &str = "Entities";
const ZONE_TYPE: &str = "Zone";

/// Failures loading or writing the entity document. Always fatal.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("failed to read entity document `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("entity document `{0}` is not valid JSON")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("entity document `{0}` has no `Entities` array")]
    Shape(PathBuf),

    #[error("failed to write entity document `{0}`")]
    Write(PathBuf, #[source] std::io::Error),
}

/// Parsed entity document.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDocument {
    root: Value,
}

impl EntityDocument {
    /// Load and validate `models.json`.
    pub fn load(path: &Path) -> Result<Self, EntityError> {
        let bytes = fs::read(path).map_err(|e| EntityError::Read(path.to_path_buf(), e))?;
        Self::from_slice(&bytes, path)
    }

    /// Load a gzip-compressed document such as `models.json.gz`.
    pub fn load_gz(path: &Path) -> Result<Self, EntityError> {
        let bytes = read_gz(path).map_err(|e| EntityError::Read(path.to_path_buf(), e))?;
        Self::from_slice(&bytes, path)
    }

    fn from_slice(bytes: &[u8], path: &Path) -> Result<Self, EntityError> {
        let root: Value =
            serde_json::from_slice(bytes).map_err(|e| EntityError::Parse(path.to_path_buf(), e))?;
        if !root.get(ENTITIES_KEY).is_some_and(Value::is_array) {
            return Err(EntityError::Shape(path.to_path_buf()));
        }
        Ok(Self { root })
    }

    #[cfg(test)]
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    fn entities(&self) -> impl Iterator<Item = &Value> {
        self.root
            .get(ENTITIES_KEY)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }

    fn entities_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.root
            .get_mut(ENTITIES_KEY)
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
    }

    /// Every `Zone` skybox URL, in document order.
    pub fn skybox_urls(&self) -> Vec<&str> {
        self.entities().filter_map(zone_skybox_url).collect()
    }

    /// Asset paths of `atp:` skyboxes: the textures eligible for baking.
    pub fn skybox_asset_paths(&self) -> FxHashSet<AssetPath> {
        self.skybox_urls()
            .into_iter()
            .filter_map(atp_asset_path)
            .collect()
    }

    /// Replace every `Zone` skybox URL found in `subs`. Returns the count.
    pub fn rewrite_skyboxes(&mut self, subs: SkyboxSubstitutions) -> usize {
        if subs.is_empty() {
            return 0;
        }

        let mut replaced = 0;
        for entity in self.entities_mut() {
            if !is_zone(entity) {
                continue;
            }
            let Some(url) = entity.pointer_mut("/skybox/url") else {
                continue;
            };
            // Lookups are keyed by canonical `atp:` URL.
            let Some(baked) = url
                .as_str()
                .and_then(atp_asset_path)
                .and_then(|path| subs.get(&atp_url(&path)))
            else {
                continue;
            };
            *url = Value::String(baked.to_owned());
            replaced += 1;
        }
        replaced
    }

    /// Compact UTF-8 JSON.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a `Value` cannot fail.
        serde_json::to_vec(&self.root).unwrap_or_default()
    }

    /// Write the gzip-compressed document.
    pub fn write_gz(&self, path: &Path) -> Result<(), EntityError> {
        write_gz(path, &self.to_bytes()).map_err(|e| EntityError::Write(path.to_path_buf(), e))
    }
}

fn is_zone(entity: &Value) -> bool {
    entity.get("type").and_then(Value::as_str) == Some(ZONE_TYPE)
}

fn zone_skybox_url(entity: &Value) -> Option<&str> {
    if !is_zone(entity) {
        return None;
    }
    entity.pointer("/skybox/url").and_then(Value::as_str)
}

/// Gzip `bytes` into `path`.
pub fn write_gz(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()?.sync_all()
}

/// Read and decompress a gzip file.
pub fn read_gz(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(path)?));
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    Ok(bytes)
}
