//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Bake and package content sets for a virtual-world server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: content-set.toml, searched upward)
    #[arg(short = 'C', long, default_value = crate::config::CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate the server build from the source tree
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        dirs: DirArgs,

        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Archive a build directory as a .tar.gz
    #[command(visible_alias = "p")]
    Package {
        /// Archive to write; must end in .tar.gz
        #[arg(value_hint = clap::ValueHint::FilePath)]
        archive: PathBuf,

        /// Build directory to archive
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output: Option<PathBuf>,
    },

    /// Copy the built entity document back into the source tree
    Pull {
        #[command(flatten)]
        dirs: DirArgs,

        /// Replace existing files without asking
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Source and build directory overrides.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DirArgs {
    /// Source directory (assets/, entities/, domain-server/)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Build output directory
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,
}

/// Arguments of the build command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Bake models and skybox textures with the external baking tool
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub bake: Option<bool>,

    /// Copy skybox textures verbatim even when baking is enabled
    #[arg(long)]
    pub skip_baking_skyboxes: bool,

    /// Baking tool executable (name on PATH or path)
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pub baker: Option<PathBuf>,

    /// Content version written to content-version.txt
    #[arg(long = "version-tag", value_name = "VERSION")]
    pub version: Option<String>,

    /// Keep the temporary bake directory for inspection
    #[arg(long)]
    pub keep_bake_dir: bool,

    /// Replace an existing entity document without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}
