//! Skybox substitutions collected while baking.

use std::collections::BTreeMap;

use crate::asset::AssetPath;

/// Asset-protocol URL prefix.
const ATP_PREFIX: &str = "atp:";

/// Asset path referenced by an `atp:` URL, or `None` for any other scheme.
pub fn atp_asset_path(url: &str) -> Option<AssetPath> {
    let path = url.strip_prefix(ATP_PREFIX)?;
    let path = AssetPath::parse(path);
    (!path.is_empty()).then_some(path)
}

/// `atp:` URL for an asset path.
pub fn atp_url(path: &AssetPath) -> String {
    format!("{ATP_PREFIX}{path}")
}

/// Accumulates original skybox URL → baked URL during the asset walk.
#[derive(Debug, Default)]
pub struct SkyboxSubstitutionsBuilder {
    entries: BTreeMap<String, String>,
}

impl SkyboxSubstitutionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the skybox at `original` was baked to `baked`.
    pub fn record(&mut self, original: &AssetPath, baked: &AssetPath) {
        self.entries.insert(atp_url(original), atp_url(baked));
    }

    pub fn finish(self) -> SkyboxSubstitutions {
        SkyboxSubstitutions(self.entries)
    }
}

/// Finalized substitution table, consumed by the entity rewrite.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SkyboxSubstitutions(BTreeMap<String, String>);

impl SkyboxSubstitutions {
    pub fn get(&self, url: &str) -> Option<&str> {
        self.0.get(url).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
