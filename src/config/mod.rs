//! Project configuration (`content-set.toml`).
//!
//! The file is optional. Without it every value falls back to its default and
//! paths resolve against the current directory.
//!
//! ```toml
//! [build]
//! source = "source"              # asset tree, entities, domain-server config
//! output = "build"               # server build directory
//! bake = false                   # run the baking tool on models and skyboxes
//! skip_baking_skyboxes = false   # copy skybox textures even when baking
//! keep_bake_dir = false          # leave baked intermediates behind
//!
//! [bake]
//! tool = "oven"                  # name on PATH or path to the baking tool
//! ```

mod error;

pub use error::ConfigError;

use crate::cli::{BuildArgs, Cli, Commands, DirArgs};
use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "content-set.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Absolute path to the config file, if one was found.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub root: PathBuf,

    pub build: BuildSection,

    pub bake: BakeSection,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    pub source: PathBuf,
    pub output: PathBuf,
    pub bake: bool,
    pub skip_baking_skyboxes: bool,
    pub keep_bake_dir: bool,

    /// Content version override (CLI only).
    #[serde(skip)]
    pub version: Option<String>,

    /// Answer yes to replace prompts (CLI only).
    #[serde(skip)]
    pub assume_yes: bool,

    /// Verbose logging (CLI only).
    #[serde(skip)]
    pub verbose: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            source: "source".into(),
            output: "build".into(),
            bake: false,
            skip_baking_skyboxes: false,
            keep_bake_dir: false,
            version: None,
            assume_yes: false,
            verbose: false,
        }
    }
}

/// `[bake]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeSection {
    /// Baking tool: a bare name is looked up on `PATH`.
    pub tool: PathBuf,
}

impl Default for BakeSection {
    fn default() -> Self {
        Self {
            tool: "oven".into(),
        }
    }
}

impl ContentConfig {
    /// Load the config for a CLI invocation and apply its overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(PathBuf::from("."), e))?;

        let mut config = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = Some(path);
                config
            }
            None => Self {
                root: cwd.clone(),
                ..Self::default()
            },
        };

        config.normalize_paths();
        config.apply_command_options(&cli.command, &cwd);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, warning about unknown keys.
    pub fn parse(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let (config, ignored) = Self::parse(&content)?;
        for field in ignored {
            log!("warning"; "unknown field `{}` in {}", field, path.display());
        }
        Ok(config)
    }

    /// Expand `~` and resolve relative paths against the config root.
    fn normalize_paths(&mut self) {
        self.build.source = resolve(&self.root, &self.build.source);
        self.build.output = resolve(&self.root, &self.build.output);
        // A bare tool name stays bare so it can be looked up on PATH.
        if self.bake.tool.components().count() > 1 {
            self.bake.tool = resolve(&self.root, &self.bake.tool);
        }
    }

    /// CLI flags win over the file. CLI paths are relative to the cwd.
    fn apply_command_options(&mut self, command: &Commands, cwd: &Path) {
        match command {
            Commands::Build { dirs, build_args } => {
                self.apply_dirs(dirs, cwd);
                self.apply_build_args(build_args, cwd);
            }
            Commands::Package { output, .. } => {
                if let Some(output) = output {
                    self.build.output = resolve(cwd, output);
                }
            }
            Commands::Pull { dirs, yes } => {
                self.apply_dirs(dirs, cwd);
                self.build.assume_yes = *yes;
            }
        }
    }

    fn apply_dirs(&mut self, dirs: &DirArgs, cwd: &Path) {
        if let Some(source) = &dirs.source {
            self.build.source = resolve(cwd, source);
        }
        if let Some(output) = &dirs.output {
            self.build.output = resolve(cwd, output);
        }
    }

    fn apply_build_args(&mut self, args: &BuildArgs, cwd: &Path) {
        if let Some(bake) = args.bake {
            self.build.bake = bake;
        }
        if args.skip_baking_skyboxes {
            self.build.skip_baking_skyboxes = true;
        }
        if args.keep_bake_dir {
            self.build.keep_bake_dir = true;
        }
        if let Some(tool) = &args.baker {
            self.bake.tool = if tool.components().count() > 1 {
                resolve(cwd, tool)
            } else {
                tool.clone()
            };
        }
        self.build.version = args.version.clone();
        self.build.assume_yes = args.yes;
        self.build.verbose = args.verbose;
    }

    /// Reject configurations that can only fail later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.source == self.build.output {
            return Err(ConfigError::Validation(format!(
                "source and output must differ (both `{}`)",
                self.build.source.display()
            )));
        }
        if self.bake.tool.as_os_str().is_empty() {
            return Err(ConfigError::Validation("`bake.tool` must not be empty".into()));
        }
        if let Some(version) = &self.build.version
            && version.trim().is_empty()
        {
            return Err(ConfigError::Validation("content version must not be empty".into()));
        }
        Ok(())
    }
}

/// Expand `~` and join a relative path onto `base`.
fn resolve(base: &Path, path: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    if expanded.is_relative() {
        base.join(expanded)
    } else {
        expanded
    }
}

/// Find the config file by searching upward from `start`.
///
/// ```text
/// /home/user/world/source/assets/  ← cwd
/// /home/user/world/content-set.toml ← found
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.is_file().then(|| config_name.to_path_buf());
    }

    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}
