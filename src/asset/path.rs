//! Canonical asset paths: the key space of the asset map.
//!
//! Invariants:
//! - Segments are joined with `/` and the whole path starts with `/`
//! - No native separator (`\`) ever appears in a canonical path
//! - The empty path stays empty (`""`)

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Split a relative path into its ordered segments.
///
/// Accepts either separator regardless of platform. Empty and `.` segments are
/// dropped, so `a//b/./c` and `a\b\c` both yield `["a", "b", "c"]`.
pub fn path_segments(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_owned)
        .collect()
}

/// Canonical, forward-slash rooted asset path such as `/models/chair.fbx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(Arc<str>);

impl AssetPath {
    /// Canonicalize an OS-native relative path.
    pub fn from_relative(path: &Path) -> Self {
        Self::parse(&path.to_string_lossy())
    }

    /// Canonicalize a string that may already be canonical (idempotent).
    pub fn parse(path: &str) -> Self {
        Self::from_segments(&path_segments(path))
    }

    fn from_segments(segments: &[String]) -> Self {
        if segments.is_empty() {
            return Self(Arc::from(""));
        }
        let mut joined = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
        for segment in segments {
            joined.push('/');
            joined.push_str(segment);
        }
        Self(Arc::from(joined))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ordered path segments (without separators).
    pub fn segments(&self) -> Vec<String> {
        path_segments(&self.0)
    }

    /// Final segment, e.g. `chair.fbx`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Directory part, e.g. `/models` for `/models/chair.fbx`.
    ///
    /// A top-level asset has the empty path as parent.
    pub fn parent(&self) -> Self {
        match self.0.rfind('/') {
            Some(idx) => Self(Arc::from(&self.0[..idx])),
            None => Self(Arc::from("")),
        }
    }

    /// Re-root a relative path (either separator) under this path.
    pub fn join(&self, relative: &str) -> Self {
        let mut segments = self.segments();
        segments.extend(path_segments(relative));
        Self::from_segments(&segments)
    }

    /// File name without its last extension, e.g. `chair` for `chair.fbx`.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Lowercase extension of the final segment, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => {
                Some(name[idx + 1..].to_ascii_lowercase())
            }
            _ => None,
        }
    }

    /// Same directory and stem, different extension.
    pub fn with_extension(&self, ext: &str) -> Self {
        self.parent().join(&format!("{}.{ext}", self.file_stem()))
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for AssetPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
