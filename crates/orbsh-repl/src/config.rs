//! Configuration for the orbsh REPL.
//!
//! Configuration is loaded from `~/.config/orbsh/config.toml`, or from the
//! path in `ORBSH_CONFIG` when set. A missing file means defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use orbsh_kernel::ShellConfig;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "ORBSH_CONFIG";

/// Configuration for the orbsh REPL and script runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplConfig {
    /// Settings seeded into `env.settings.*`.
    #[serde(default)]
    pub shell: ShellConfig,

    /// Append tracing output to this file, without ANSI colors.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Where REPL history is kept. Defaults to the user data directory.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// Script run at REPL start. Defaults to `profile.orbsh` next to the config.
    #[serde(default)]
    pub profile: Option<PathBuf>,
}

impl ReplConfig {
    /// Load configuration from `ORBSH_CONFIG` or the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::config_path()?,
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "orbsh").context("Could not determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// The history file, configured or default.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file.clone().or_else(|| {
            BaseDirs::new().map(|b| b.data_dir().join("orbsh").join("history.txt"))
        })
    }

    /// The profile script, configured or default.
    pub fn profile_path(&self) -> Option<PathBuf> {
        self.profile.clone().or_else(|| {
            ProjectDirs::from("", "", "orbsh").map(|d| d.config_dir().join("profile.orbsh"))
        })
    }
}
