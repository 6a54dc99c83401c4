//! Configuration for `inliner.toml`.
//!
//! # Sections
//!
//! | Section   | Purpose                                        |
//! |-----------|------------------------------------------------|
//! | `[build]` | Source, data and output paths, merge engine    |
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "templates"
//! data = "data"
//! output = "out"
//! merge = "placeholder"
//! ```
//!
//! The file is optional. Values are read once at startup, overridden by CLI
//! flags, normalized to absolute paths against the project root and passed
//! by reference from there on.

mod build;
pub mod defaults;
mod error;

pub use build::BuildConfig;
pub use error::ConfigError;

use crate::cli::{Cli, Commands};
use crate::utils::category::normalize_path;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing inliner.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct InlinerConfig {
    /// Absolute project root (set after loading)
    #[serde(skip)]
    pub root: PathBuf,

    /// `watch` rather than one-shot `build`
    #[serde(skip)]
    pub interactive: bool,

    #[serde(default)]
    pub build: BuildConfig,
}

impl InlinerConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Read `<root>/<config>` if present, apply CLI overrides and validate.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let config_path = cli.root.join(&cli.config);
        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.build.source, cli.source.as_ref());
        Self::update_option(&mut self.build.data, cli.data.as_ref());
        Self::update_option(&mut self.build.merge, cli.merge.as_ref());
        if cli.output.is_some() {
            self.build.output = cli.output.clone();
        }
        self.interactive = matches!(cli.command, Commands::Watch);

        self.update_path_with_root(&cli.root);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve every path against `root` and normalize to absolute
    fn update_path_with_root(&mut self, root: &Path) {
        let root = normalize_path(root);

        self.build.source = normalize_path(&root.join(&self.build.source));
        self.build.data = normalize_path(&root.join(&self.build.data));
        self.build.output = self
            .build
            .output
            .as_ref()
            .map(|output| normalize_path(&root.join(output)));
        self.root = root;
    }

    /// Output directory for interactive mode.
    pub fn output_dir(&self) -> PathBuf {
        self.build
            .output
            .clone()
            .unwrap_or_else(|| self.root.join(defaults::build::watch_output()))
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.build.source.is_dir() {
            return Err(ConfigError::Validation(format!(
                "[build.source] `{}` is not a directory",
                self.build.source.display()
            )));
        }

        if self.interactive && self.output_dir() == self.build.source {
            return Err(ConfigError::Validation(
                "[build.output] must differ from [build.source] in watch mode".into(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
