//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument / environment variable (handled by the binary's clap args)
//! 2. TOML config file
//! 3. OS-dependent compiled default (fallback)
//!
//! A missing or broken config file never prevents startup; it is logged and
//! the compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BRIEFING_CONFIG";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5730;

/// Edition assigned to feedback rows that predate edition tracking
pub const DEFAULT_LEGACY_EDITION: &str = "unassigned";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub content_root: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub legacy_override: Option<PathBuf>,
    pub legacy_feedback_csv: Option<PathBuf>,
    pub legacy_edition: Option<String>,
}

/// Values supplied on the command line (or via their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub content_root: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding one sub-directory per edition
    pub content_root: PathBuf,
    /// SQLite feedback database file
    pub database: PathBuf,
    pub bind: String,
    pub port: u16,
    /// Single override document merged over the built-in default edition
    pub legacy_override: Option<PathBuf>,
    /// Flat-file feedback written by the earliest revision, imported once
    pub legacy_feedback_csv: Option<PathBuf>,
    /// Edition assigned to imported legacy feedback
    pub legacy_edition: String,
}

impl Config {
    /// Merge overrides, file settings and compiled defaults
    pub fn resolve(overrides: Overrides, file: TomlConfig) -> Self {
        let data_dir = default_data_dir();

        Self {
            content_root: overrides
                .content_root
                .or(file.content_root)
                .unwrap_or_else(|| data_dir.join("content")),
            database: overrides
                .database
                .or(file.database)
                .unwrap_or_else(|| data_dir.join("feedback.db")),
            bind: overrides
                .bind
                .or(file.bind)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            legacy_override: file.legacy_override,
            legacy_feedback_csv: file.legacy_feedback_csv,
            legacy_edition: file
                .legacy_edition
                .unwrap_or_else(|| DEFAULT_LEGACY_EDITION.to_string()),
        }
    }

    /// Locate and read the config file, then resolve against overrides
    pub fn load(overrides: Overrides) -> Self {
        let file = match find_config_file() {
            Some(path) => match load_toml_config(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    TomlConfig::default()
                }
            },
            None => {
                info!("No config file found, using defaults");
                TomlConfig::default()
            }
        };

        Self::resolve(overrides, file)
    }

    /// Socket address string for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Find the config file for the platform
///
/// `BRIEFING_CONFIG` wins when set; otherwise the user config directory is
/// tried, then `/etc/briefing/config.toml` on Linux.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points at missing file {}", CONFIG_ENV_VAR, path.display());
    }

    let user_config = dirs::config_dir().map(|d| d.join("briefing").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/briefing/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("briefing"))
        .unwrap_or_else(|| PathBuf::from("./briefing_data"))
}
