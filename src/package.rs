//! Distribution archive of a build directory.
//!
//! The archive carries `assignment-client/`, `domain-server/` and
//! `content-version.txt` under relative paths. Ownership and timestamps are
//! normalized so the same build always packs to the same bytes.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use jwalk::WalkDir;
use tar::{Builder, EntryType, Header, HeaderMode};

use crate::build::BuildLayout;
use crate::log;

/// Required archive suffix.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

const OWNER: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    Written(PathBuf),
    /// The archive name was not a `.tar.gz`; nothing was written.
    Skipped,
}

/// Write `archive` from the build directory at `build_dir`.
pub fn package_build(build_dir: &Path, archive: &Path) -> Result<PackageOutcome> {
    let name = archive.file_name().unwrap_or_default().to_string_lossy();
    if !name.ends_with(ARCHIVE_SUFFIX) || name.len() == ARCHIVE_SUFFIX.len() {
        log!("package"; "`{}` is not a {} archive, skipping", archive.display(), ARCHIVE_SUFFIX);
        return Ok(PackageOutcome::Skipped);
    }

    let layout = BuildLayout::new(build_dir);
    if !layout.assignment_client.is_dir() {
        anyhow::bail!(
            "`{}` is not a build directory (missing assignment-client/)",
            build_dir.display()
        );
    }

    if let Some(parent) = archive.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }

    let file = File::create(archive)
        .with_context(|| format!("failed to create archive `{}`", archive.display()))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));

    let mut entries = 0;
    for top in layout.archive_entries() {
        if top.exists() {
            entries += append_tree(&mut builder, build_dir, top)?;
        }
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .and_then(|file| file.sync_all())
        .with_context(|| format!("failed to finalize archive `{}`", archive.display()))?;

    log!("package"; "wrote {} ({} entries)", archive.display(), entries);
    Ok(PackageOutcome::Written(archive.to_path_buf()))
}

/// Append `top` and everything below it, sorted, relative to `base`.
fn append_tree<W: io::Write>(builder: &mut Builder<W>, base: &Path, top: &Path) -> Result<usize> {
    if top.is_file() {
        append_path(builder, base, top)?;
        return Ok(1);
    }

    let mut count = 0;
    for entry in WalkDir::new(top).skip_hidden(false).sort(true) {
        let entry = entry.with_context(|| format!("failed to walk `{}`", top.display()))?;
        append_path(builder, base, &entry.path())?;
        count += 1;
    }
    Ok(count)
}

fn append_path<W: io::Write>(builder: &mut Builder<W>, base: &Path, path: &Path) -> Result<()> {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to stat `{}`", path.display()))?;

    let mut header = normalized_header(&metadata)?;
    let appended = if metadata.is_dir() {
        builder.append_data(&mut header, relative, io::empty())
    } else {
        let file =
            File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
        builder.append_data(&mut header, relative, file)
    };
    appended.with_context(|| format!("failed to archive `{}`", relative.display()))
}

/// Header with root ownership and a zero timestamp.
fn normalized_header(metadata: &fs::Metadata) -> Result<Header> {
    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(metadata, HeaderMode::Deterministic);
    if metadata.is_dir() {
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
    }
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_username(OWNER)?;
    header.set_groupname(OWNER)?;
    Ok(header)
}
