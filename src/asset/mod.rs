//! Asset addressing: canonical paths, content hashes, the store and the map.

mod hash;
mod map;
mod path;
mod store;

use std::path::PathBuf;

pub use hash::{ContentHash, hash_file};
pub use map::{AssetMapBuilder, Collisions};
pub use path::AssetPath;
pub use store::{ContentStore, Stored};

/// One file that ended up in the store, addressed by its canonical path.
///
/// A baked source can produce several records, one per output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Absolute path of the bytes that were stored.
    pub source: PathBuf,
    pub path: AssetPath,
    pub hash: ContentHash,
}
