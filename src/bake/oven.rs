//! Subprocess-backed baker: runs the external baking tool once per file.

use std::path::{Path, PathBuf};

use super::{BakeError, BakeKind, BakedFile, Baker, baked_root, collect_baked};
use crate::debug;
use crate::utils::exec::{Cmd, FilterRule};

/// Tool chatter that is never worth showing.
const OVEN_FILTER: FilterRule = FilterRule::new(&["QStandardPaths:", "qt.", "[INFO]"]);

/// Invokes `<tool> -i <input> -o <output_dir> -t <model|texture>`.
#[derive(Debug, Clone)]
pub struct OvenBaker {
    tool: PathBuf,
    verbose: bool,
}

impl OvenBaker {
    pub fn new(tool: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            tool: tool.into(),
            verbose,
        }
    }

    /// Resolve a bare tool name through `PATH`; explicit paths are kept.
    pub fn locate(tool: &Path, verbose: bool) -> anyhow::Result<Self> {
        let resolved = if tool.components().count() > 1 {
            tool.to_path_buf()
        } else {
            which::which(tool).map_err(|e| {
                anyhow::anyhow!("baking tool `{}` not found on PATH: {e}", tool.display())
            })?
        };
        Ok(Self::new(resolved, verbose))
    }

    #[cfg(test)]
    pub fn tool(&self) -> &Path {
        &self.tool
    }

    fn command(&self, input: &Path, output_dir: &Path, kind: BakeKind) -> Cmd {
        Cmd::new(&self.tool)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output_dir)
            .args(["-t", kind.as_arg()])
    }
}

impl Baker for OvenBaker {
    fn bake(
        &self,
        input: &Path,
        output_dir: &Path,
        kind: BakeKind,
    ) -> Result<Vec<BakedFile>, BakeError> {
        let cmd = self.command(input, output_dir, kind);
        debug!(self.verbose, "bake"; "{} {} ({})", cmd.program_name(), input.display(), kind.as_arg());

        let output = cmd.output().map_err(|source| BakeError::Spawn {
            tool: cmd.program_name(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BakeError::ToolFailed {
                status: output.status.to_string(),
                stderr: OVEN_FILTER.lines(&stderr).join("\n"),
            });
        }

        if self.verbose {
            let stdout = String::from_utf8_lossy(&output.stdout);
            OVEN_FILTER.log("bake", &stdout);
        }

        collect_baked(&baked_root(output_dir, input, kind))
    }
}
