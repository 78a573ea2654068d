use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("IO error reading config: {0}")]
    IoError(String),
}

/// Settings read from `config.toml`.
///
/// Relative paths are taken relative to the directory holding the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HarnessConfig {
    /// Bootstrap scripts evaluated before the main script, in order
    #[serde(default)]
    pub includes: Vec<PathBuf>,

    /// Directories searched for bundled resources when a path is not on disk
    #[serde(default)]
    pub resource_roots: Vec<PathBuf>,

    /// Globals bound into every session
    #[serde(default)]
    pub globals: BTreeMap<String, toml::Value>,

    /// Also write logs to the data directory
    #[serde(default)]
    pub log_to_file: bool,
}

impl HarnessConfig {
    /// Default location of the config file, if a home directory can be found.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "jsharness").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `explicit` if given, otherwise from [`HarnessConfig::config_path`].
    ///
    /// A missing default config yields the defaults; a missing explicit one
    /// is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigLoadError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        for path in self.includes.iter_mut().chain(self.resource_roots.iter_mut()) {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Directory for log files and other generated data.
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "jsharness").map(|dirs| dirs.data_dir().to_path_buf())
}
