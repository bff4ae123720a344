//! Build orchestration.
//!
//! Pipeline phases:
//! - **Scan** - Load the entity document, collect skybox asset paths
//! - **Walk** - Bake or copy every asset into the content-addressed store
//! - **Map** - Write `map.json` once the walk is complete
//! - **Entities** - Substitute baked skyboxes, write `models.json.gz`
//! - **Extras** - Domain-server config and content version
//!
//! Everything runs sequentially; bakes block until the tool exits.

mod layout;
#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use jwalk::WalkDir;
use rustc_hash::FxHashSet;
use tempfile::TempDir;

use crate::asset::{AssetMapBuilder, AssetPath, Collisions, ContentStore, Stored};
use crate::bake::{
    BakeError, BakeKind, BakeOptions, Baker, baked_asset_path, baked_skybox_path, decide,
};
use crate::config::ContentConfig;
use crate::entity::{EntityDocument, SkyboxSubstitutionsBuilder};
use crate::logger::ProgressLine;
use crate::prompt::Confirm;
use crate::utils::plural_count;
use crate::{debug, log};

pub use layout::{BuildLayout, SourceLayout};

/// Files never treated as assets.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Inputs of one build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    pub bake: bool,
    pub skip_baking_skyboxes: bool,
    /// Written to `content-version.txt`; otherwise the source copy is used.
    pub version: Option<String>,
    /// Leave the temporary bake directory behind.
    pub keep_bake_dir: bool,
    pub verbose: bool,
    /// Show the in-place progress line.
    pub progress: bool,
}

impl BuildOptions {
    #[cfg(test)]
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            bake: false,
            skip_baking_skyboxes: false,
            version: None,
            keep_bake_dir: false,
            verbose: false,
            progress: false,
        }
    }

    pub fn from_config(config: &ContentConfig) -> Self {
        let build = &config.build;
        Self {
            source: build.source.clone(),
            output: build.output.clone(),
            bake: build.bake,
            skip_baking_skyboxes: build.skip_baking_skyboxes,
            version: build.version.clone(),
            keep_bake_dir: build.keep_bake_dir,
            verbose: build.verbose,
            progress: true,
        }
    }

    fn bake_options(&self) -> BakeOptions {
        BakeOptions {
            enabled: self.bake,
            skip_skyboxes: self.skip_baking_skyboxes,
        }
    }
}

/// A source file the baking tool could not process. It is left out of the
/// build entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakeFailure {
    pub path: AssetPath,
    pub source: PathBuf,
    pub reason: String,
}

/// What happened to the entity document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityOutcome {
    /// Written with this many skybox substitutions.
    Written { replaced: usize },
    /// An existing output was kept at the operator's request.
    #[default]
    Kept,
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Source files walked.
    pub assets: usize,
    /// Sources copied verbatim.
    pub copied: usize,
    /// Sources baked successfully.
    pub baked: usize,
    pub bake_failures: Vec<BakeFailure>,
    /// Distinct objects referenced by the map.
    pub objects: usize,
    /// Objects newly written to the store.
    pub written: usize,
    /// Entries in `map.json`.
    pub map_entries: usize,
    pub collisions: Collisions,
    pub entities: EntityOutcome,
    /// Temporary bake directory left behind on request.
    pub kept_bake_dir: Option<PathBuf>,
}

/// Generate the server build from `options.source` into `options.output`.
///
/// Bake failures are reported and skipped; I/O errors and a missing or
/// malformed entity document abort the build.
pub fn generate_build(
    options: &BuildOptions,
    baker: &dyn Baker,
    confirm: &dyn Confirm,
) -> Result<BuildReport> {
    let source = SourceLayout::new(&options.source);
    let layout = BuildLayout::new(&options.output);

    // Scan
    let mut document = EntityDocument::load(&source.entities)?;
    let skyboxes = document.skybox_asset_paths();
    debug!(options.verbose, "entities"; "{} referenced by zones", plural_count(skyboxes.len(), "skybox"));

    let files = collect_assets(&source.assets)?;
    layout.create()?;

    // Scoped: removed on every exit path unless kept below.
    let bake_dir = if options.bake {
        let dir = tempfile::Builder::new()
            .prefix("content-set-bake-")
            .tempdir()
            .context("failed to create temporary bake directory")?;
        debug!(options.verbose, "bake"; "intermediates in {}", dir.path().display());
        Some(dir)
    } else {
        None
    };

    // Walk
    let mut walk = AssetWalk {
        options,
        bake: options.bake_options(),
        skyboxes: &skyboxes,
        baker,
        bake_dir: bake_dir.as_ref(),
        store: ContentStore::open(&layout.files)?,
        map: AssetMapBuilder::new(options.verbose),
        substitutions: SkyboxSubstitutionsBuilder::new(),
        report: BuildReport {
            assets: files.len(),
            ..BuildReport::default()
        },
    };

    let mut progress = ProgressLine::new(&[("assets", files.len())], options.progress);
    for (index, file) in files.iter().enumerate() {
        walk.process(index, &source.assets, file)?;
        progress.inc("assets");
    }
    progress.finish();

    let AssetWalk {
        store,
        map,
        substitutions,
        mut report,
        ..
    } = walk;

    // Map
    let (map, collisions) = map.finish();
    map.write(&layout.asset_map)?;
    report.map_entries = map.len();
    report.objects = store.object_count();
    report.written = store.written_count();
    report.collisions = collisions;

    // Entities
    report.entities = if layout.entities.exists()
        && !confirm.confirm(&format!(
            "{} already exists. Replace it?",
            layout.entities.display()
        )) {
        log!("entities"; "kept existing {}", layout.entities.display());
        EntityOutcome::Kept
    } else {
        let replaced = document.rewrite_skyboxes(substitutions.finish());
        document.write_gz(&layout.entities)?;
        debug!(options.verbose, "entities"; "{} substituted", plural_count(replaced, "skybox"));
        EntityOutcome::Written { replaced }
    };

    // Extras
    copy_extras(&source, &layout, options.version.as_deref())?;

    if let Some(dir) = bake_dir
        && options.keep_bake_dir
    {
        let kept = dir.keep();
        log!("bake"; "kept intermediates in {}", kept.display());
        report.kept_bake_dir = Some(kept);
    }

    log_summary(&report);
    Ok(report)
}

/// All files under `assets`, sorted so collisions resolve deterministically.
/// Symlinks are followed to files; links to directories are not walked.
fn collect_assets(assets: &Path) -> Result<Vec<PathBuf>> {
    if !assets.is_dir() {
        bail!("asset directory `{}` does not exist", assets.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(assets).skip_hidden(false).sort(true) {
        let entry = entry.with_context(|| format!("failed to walk `{}`", assets.display()))?;
        let file_type = entry.file_type();
        let path = entry.path();
        // Links to files are assets under the link's own path.
        if file_type.is_symlink() {
            if !fs::metadata(&path).is_ok_and(|meta| meta.is_file()) {
                log!("warning"; "skipping link {}: not a file", path.display());
                continue;
            }
        } else if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_str().unwrap_or_default();
        if IGNORED_FILES.contains(&name) {
            continue;
        }
        files.push(path);
    }
    Ok(files)
}

/// Mutable state of the asset walk, owned by `generate_build`.
struct AssetWalk<'a> {
    options: &'a BuildOptions,
    bake: BakeOptions,
    skyboxes: &'a FxHashSet<AssetPath>,
    baker: &'a dyn Baker,
    bake_dir: Option<&'a TempDir>,
    store: ContentStore,
    map: AssetMapBuilder,
    substitutions: SkyboxSubstitutionsBuilder,
    report: BuildReport,
}

impl AssetWalk<'_> {
    fn process(&mut self, index: usize, assets_root: &Path, file: &Path) -> Result<()> {
        let relative = file.strip_prefix(assets_root).unwrap_or(file);
        let path = AssetPath::from_relative(relative);

        match (decide(&path, self.skyboxes, self.bake), self.bake_dir) {
            (Some(kind), Some(dir)) => {
                let output_dir = dir.path().join(index.to_string());
                fs::create_dir_all(&output_dir)
                    .with_context(|| format!("failed to create `{}`", output_dir.display()))?;
                self.bake_asset(file, path, kind, &output_dir)
            }
            _ => {
                self.store_file(file, path)?;
                self.report.copied += 1;
                Ok(())
            }
        }
    }

    fn bake_asset(
        &mut self,
        file: &Path,
        path: AssetPath,
        kind: BakeKind,
        output_dir: &Path,
    ) -> Result<()> {
        debug!(self.options.verbose, "bake"; "{} ({})", path, kind.as_arg());

        let outputs = self
            .baker
            .bake(file, output_dir, kind)
            .and_then(|outputs| {
                if outputs.is_empty() {
                    Err(BakeError::MissingOutput(output_dir.to_path_buf()))
                } else {
                    Ok(outputs)
                }
            });

        let outputs = match outputs {
            Ok(outputs) => outputs,
            Err(err) => {
                log!("error"; "failed to bake {}: {}", path, err);
                self.report.bake_failures.push(BakeFailure {
                    path,
                    source: file.to_path_buf(),
                    reason: err.to_string(),
                });
                return Ok(());
            }
        };

        for output in &outputs {
            let baked_path = baked_asset_path(&path, &output.relative);
            self.store_file(&output.absolute, baked_path)?;
        }

        if kind == BakeKind::Texture {
            self.substitutions.record(&path, &baked_skybox_path(&path));
        }
        self.report.baked += 1;
        Ok(())
    }

    fn store_file(&mut self, file: &Path, path: AssetPath) -> Result<()> {
        let (record, stored) = self.store.insert(file, path)?;
        if stored == Stored::Existing {
            debug!(self.options.verbose, "store"; "reuse {} for {}", record.hash, record.path);
        }
        self.map.record(&record);
        Ok(())
    }
}

/// Copy the domain-server config and write the content version.
fn copy_extras(source: &SourceLayout, layout: &BuildLayout, version: Option<&str>) -> Result<()> {
    if source.domain_config.is_file() {
        fs::copy(&source.domain_config, &layout.domain_config).with_context(|| {
            format!("failed to copy `{}`", source.domain_config.display())
        })?;
    }

    match version {
        Some(version) => fs::write(&layout.content_version, format!("{}\n", version.trim()))
            .with_context(|| format!("failed to write `{}`", layout.content_version.display()))?,
        None if source.content_version.is_file() => {
            fs::copy(&source.content_version, &layout.content_version).with_context(|| {
                format!("failed to copy `{}`", source.content_version.display())
            })?;
        }
        None => {}
    }
    Ok(())
}

fn log_summary(report: &BuildReport) {
    log!(
        "build";
        "{} ({} baked, {} copied) -> {}, {} new",
        plural_count(report.assets, "asset"),
        report.baked,
        report.copied,
        plural_count(report.objects, "object"),
        report.written
    );

    if !report.collisions.overwrites.is_empty() {
        log!(
            "warning";
            "{} replaced an earlier mapping; the earlier objects are no longer referenced",
            plural_count(report.collisions.overwrites.len(), "path")
        );
    }

    if !report.bake_failures.is_empty() {
        log!(
            "warning";
            "{} failed to bake and {} left out:",
            plural_count(report.bake_failures.len(), "file"),
            if report.bake_failures.len() == 1 { "was" } else { "were" }
        );
        for failure in &report.bake_failures {
            eprintln!("  - {}", failure.path);
        }
    }
}
