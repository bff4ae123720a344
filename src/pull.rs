//! Copy the built entity document back into the source tree.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::build::{BuildLayout, SourceLayout};
use crate::entity::EntityDocument;
use crate::log;
use crate::prompt::Confirm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Pulled,
    /// No `models.json.gz` in the build; nothing to pull.
    NoBuild,
    /// The operator declined to replace the source document.
    Declined,
}

/// Decompress `build/.../models.json.gz` into `source/entities/models.json`.
pub fn pull_build(source: &Path, output: &Path, confirm: &dyn Confirm) -> Result<PullOutcome> {
    let source = SourceLayout::new(source);
    let layout = BuildLayout::new(output);

    if !layout.entities.is_file() {
        log!("pull"; "no build found at {}", layout.entities.display());
        return Ok(PullOutcome::NoBuild);
    }

    let prompt = format!(
        "Replace {} with the built entities?",
        source.entities.display()
    );
    if !confirm.confirm(&prompt) {
        log!("pull"; "cancelled");
        return Ok(PullOutcome::Declined);
    }

    // Validated before the source copy is touched.
    let document = EntityDocument::load_gz(&layout.entities)?;
    if let Some(parent) = source.entities.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    fs::write(&source.entities, document.to_bytes())
        .with_context(|| format!("failed to write `{}`", source.entities.display()))?;

    log!("pull"; "updated {}", source.entities.display());
    Ok(PullOutcome::Pulled)
}
