//! TOML configuration file.
//!
//! ```toml
//! timeout = "5s"
//! wait_interval = "20s"
//! staleness_window_secs = 1200
//! user_agent = "replcheck (ops@example.org)"
//!
//! [aliases]
//! "cvmfs-stratum-one.cern.ch" = "CERN"
//! "cvmfs.fnal.gov" = "FNAL"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid duration for '{key}' in {path}: {value}")]
    InvalidDuration {
        path: PathBuf,
        key: &'static str,
        value: String,
    },

    #[error("'{key}' in {path} must be between {min} and {max}, got {value}")]
    OutOfRange {
        path: PathBuf,
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Raw file contents; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub wait_interval: Option<String>,
    #[serde(default)]
    pub staleness_window_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Host name → display alias.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl FileConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }
}

/// `$XDG_CONFIG_HOME/replcheck/config.toml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("replcheck").join("config.toml"))
}
