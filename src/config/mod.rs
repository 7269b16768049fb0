//! Deploy configuration management for `deploy.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   └── deploy     # [deploy], [deploy.commit]
//! ├── error          # ConfigError, ConfigDiagnostics
//! └── mod.rs         # Config (this file)
//! ```
//!
//! The file is optional: without it the built-in defaults apply. The push
//! token is read from the environment here, once, and carried in [`Config`]
//! so nothing downstream touches the process environment.

mod error;
pub mod section;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{BuildConfig, DeployConfig};

use crate::{
    cli::{Cli, Commands},
    debug, log,
    utils::secret::Secret,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file name looked up in the project root.
pub const DEFAULT_CONFIG: &str = "deploy.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing deploy.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Project root directory, the working directory at start-up (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Push token, resolved from `deploy.token_env` (internal use only)
    #[serde(skip)]
    pub token: Option<Secret>,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Deployment settings
    #[serde(default)]
    pub deploy: DeployConfig,
}

impl Config {
    /// Load configuration from CLI arguments.
    ///
    /// The project root is the current working directory; the output
    /// directory and config file are resolved against it.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = std::env::current_dir().context("Failed to get current working directory")?;
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else if cli.config != Path::new(DEFAULT_CONFIG) {
            return Err(ConfigError::Io(
                config_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            )
            .into());
        } else {
            debug!("config"; "{} not found, using defaults", DEFAULT_CONFIG);
            Self::default()
        };

        config.root = root;
        config.apply_command_options(cli);
        config.normalize_paths();
        config.token = Secret::from_env(&config.deploy.token_env);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    pub(crate) fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Absolute output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build.output)
    }

    /// Push token, or a configuration error naming the variable.
    pub fn require_token(&self) -> Result<&Secret, ConfigError> {
        self.token
            .as_ref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingToken {
                var: self.deploy.token_env.clone(),
            })
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        if let Some(output) = &cli.output {
            self.build.output = output.clone();
        }

        if let Commands::Publish { args } = cli.command() {
            Self::update_option(&mut self.deploy.force, args.force.as_ref());
            if args.allow_empty {
                self.deploy.allow_empty = true;
            }
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Expand `~` in the output path.
    fn normalize_paths(&mut self) {
        if let Some(raw) = self.build.output.to_str() {
            self.build.output = PathBuf::from(shellexpand::tilde(raw).into_owned());
        }
    }

    /// Validate all sections, printing warnings and failing on errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.build.validate(&mut diag);
        self.deploy.validate(&mut diag);

        if which::which("git").is_err() {
            diag.warn("git", "`git` not found on PATH");
        }

        diag.print_warnings();
        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

/// Parse a test config, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
