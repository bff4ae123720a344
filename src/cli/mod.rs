//! Command-line interface and command runners.

mod args;

pub use args::{BuildArgs, Cli, Commands, DirArgs};

use std::path::Path;

use anyhow::Result;

use crate::bake::OvenBaker;
use crate::build::{BuildOptions, generate_build};
use crate::config::ContentConfig;
use crate::package::package_build;
use crate::prompt::confirmer;
use crate::pull::pull_build;

/// Run `build` with the resolved configuration.
///
/// Bake failures are listed by the build summary and do not fail the command.
pub fn run_build(config: &ContentConfig) -> Result<()> {
    let options = BuildOptions::from_config(config);
    // The tool is only resolved when it will actually run.
    let baker = if options.bake {
        OvenBaker::locate(&config.bake.tool, options.verbose)?
    } else {
        OvenBaker::new(&config.bake.tool, options.verbose)
    };

    let confirm = confirmer(config.build.assume_yes);
    generate_build(&options, &baker, confirm.as_ref()).map(|_| ())
}

/// Run `package` into `archive`.
pub fn run_package(config: &ContentConfig, archive: &Path) -> Result<()> {
    package_build(&config.build.output, archive).map(|_| ())
}

/// Run `pull`.
pub fn run_pull(config: &ContentConfig) -> Result<()> {
    let confirm = confirmer(config.build.assume_yes);
    pull_build(&config.build.source, &config.build.output, confirm.as_ref()).map(|_| ())
}
