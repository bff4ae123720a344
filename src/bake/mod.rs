//! Baking: deciding which assets go through the external baking tool, and
//! mapping what the tool produced back into the asset namespace.
//!
//! ```text
//! source/assets/models/chair.fbx
//!   └─ bake(model) → <tmp>/0/chair/baked/chair.baked.fbx
//!                                       chair.fbm/wood.baked.ktx
//!   → /models/chair.fbx, /models/chair.fbm/wood.ktx
//! ```

mod oven;

use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::asset::AssetPath;

pub use oven::OvenBaker;

/// Extensions the baking tool always processes.
pub const MODEL_EXTENSIONS: &[&str] = &["fbx"];

/// Extensions the baking tool processes when the texture is a skybox.
pub const TEXTURE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tga"];

/// Fixed target format of baked textures.
pub const BAKED_TEXTURE_EXTENSION: &str = "ktx";

/// Marker the tool inserts before the extension of each output.
const BAKED_MARKER: &str = ".baked";

/// Asset category by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Texture,
    Other,
}

impl AssetKind {
    /// Classify a lowercase or mixed-case extension.
    pub fn classify(ext: Option<&str>) -> Self {
        let Some(ext) = ext.map(str::to_ascii_lowercase) else {
            return Self::Other;
        };
        if MODEL_EXTENSIONS.contains(&ext.as_str()) {
            Self::Model
        } else if TEXTURE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Texture
        } else {
            Self::Other
        }
    }
}

/// What the tool is asked to do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeKind {
    Model,
    Texture,
}

impl BakeKind {
    /// Value of the tool's `-t` argument.
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Texture => "texture",
        }
    }
}

/// Switches that gate baking for a whole build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BakeOptions {
    pub enabled: bool,
    pub skip_skyboxes: bool,
}

/// Decide whether `path` must be baked, and how.
///
/// Models are always baked. Textures are baked only when a zone uses them as
/// a skybox and skybox baking is not skipped. Everything else is copied.
pub fn decide(
    path: &AssetPath,
    skyboxes: &FxHashSet<AssetPath>,
    options: BakeOptions,
) -> Option<BakeKind> {
    if !options.enabled {
        return None;
    }
    match AssetKind::classify(path.extension().as_deref()) {
        AssetKind::Model => Some(BakeKind::Model),
        AssetKind::Texture if !options.skip_skyboxes && skyboxes.contains(path) => {
            Some(BakeKind::Texture)
        }
        _ => None,
    }
}

/// One file produced by a bake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedFile {
    /// Path relative to the baked root, e.g. `chair.fbm/wood.baked.ktx`.
    pub relative: PathBuf,
    pub absolute: PathBuf,
}

/// Per-file bake failure. Never fatal to a build.
#[derive(Debug, Error)]
pub enum BakeError {
    #[error("failed to run baking tool `{tool}`")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("baking tool exited with {status}{}", stderr_suffix(.stderr))]
    ToolFailed { status: String, stderr: String },

    #[error("baking tool produced no output under `{0}`")]
    MissingOutput(PathBuf),

    #[error("failed to read baked output")]
    Walk(#[source] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Injectable baking collaborator.
///
/// `bake` runs synchronously and returns every file the bake produced, or an
/// error when the file could not be baked.
pub trait Baker {
    fn bake(
        &self,
        input: &Path,
        output_dir: &Path,
        kind: BakeKind,
    ) -> Result<Vec<BakedFile>, BakeError>;
}

/// Where the tool leaves its outputs for `input`.
///
/// Textures land directly in `output_dir`; models under
/// `output_dir/<stem>/baked`.
pub fn baked_root(output_dir: &Path, input: &Path, kind: BakeKind) -> PathBuf {
    match kind {
        BakeKind::Texture => output_dir.to_path_buf(),
        BakeKind::Model => {
            let stem = input.file_stem().unwrap_or_default();
            output_dir.join(stem).join("baked")
        }
    }
}

/// Enumerate every file under `root`, sorted, relative to `root`.
pub fn collect_baked(root: &Path) -> Result<Vec<BakedFile>, BakeError> {
    if !root.is_dir() {
        return Err(BakeError::MissingOutput(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry = entry.map_err(|e| BakeError::Walk(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let absolute = entry.path();
        let relative = absolute
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute.clone());
        files.push(BakedFile { relative, absolute });
    }
    Ok(files)
}

/// Remove the `.baked` marker from a file name: `texture.baked.ktx` → `texture.ktx`.
pub fn strip_baked_marker(name: &str) -> String {
    match name.rfind('.') {
        Some(ext_start) if name[..ext_start].ends_with(BAKED_MARKER) => {
            let stem = &name[..ext_start - BAKED_MARKER.len()];
            format!("{stem}{}", &name[ext_start..])
        }
        _ => name.to_string(),
    }
}

/// Canonical path of a baked output: marker stripped, re-rooted under the
/// original asset's directory.
pub fn baked_asset_path(original: &AssetPath, relative: &Path) -> AssetPath {
    let relative = AssetPath::from_relative(relative);
    let name = strip_baked_marker(relative.file_name());
    let dir = relative.parent();
    original.parent().join(dir.as_str()).join(&name)
}

/// `atp:` URL the rewritten entity document uses for a baked skybox.
pub fn baked_skybox_path(original: &AssetPath) -> AssetPath {
    original.with_extension(BAKED_TEXTURE_EXTENSION)
}
